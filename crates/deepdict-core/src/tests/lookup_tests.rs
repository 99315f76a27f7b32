use std::sync::Arc;
use std::time::Duration;

use deepdict_config::Config;
use deepdict_llm::{LlmError, Role};
use deepdict_store::{EntryQuery, EntryStore, SqliteStore};
use deepdict_types::{EntryKey, LanguageSettings, SentenceContext};
use tokio::time::timeout;

use super::support::{Log, ScriptedModel, drain_until, entry_json, service};
use crate::error::JobError;
use crate::queue::{JobExecutor, JobKind, JobOutput, JobRequest, RequestQueue};
use crate::synth::SynthesisError;

fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

fn czech() -> LanguageSettings {
    LanguageSettings::new("Czech", "English")
}

#[tokio::test]
async fn test_lemma_is_resolved_and_cached() {
    let model = ScriptedModel::new();
    model.reply("run");
    let store = store();
    let service = service(model.clone(), store.clone());

    let lemma = timeout(
        Duration::from_secs(2),
        service.lemmas().resolve("running", "English", None),
    )
    .await
    .unwrap();

    assert_eq!(lemma, "run");
    assert_eq!(model.call_count(), 1);
    assert_eq!(
        store.get_cached_lemma("running", "English").unwrap().as_deref(),
        Some("run")
    );

    let (messages, temperature) = model.call(0);
    assert_eq!(temperature, None);
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[1].content.contains("\"running\""));
}

#[tokio::test]
async fn test_cached_lemma_skips_the_model() {
    let model = ScriptedModel::new();
    let store = store();
    store.cache_lemma("running", "run", "English").unwrap();
    let service = service(model.clone(), store.clone());

    assert_eq!(service.lemmas().resolve("Running", "English", None).await, "run");
    assert_eq!(service.lemmas().resolve("  running ", "English", None).await, "run");
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn test_context_bypasses_the_cache() {
    let model = ScriptedModel::new();
    model.reply("běžet");
    let store = store();
    store.cache_lemma("běžel", "stale", "Czech").unwrap();
    let service = service(model.clone(), store.clone());

    let lemma = service
        .lemmas()
        .resolve("běžel", "Czech", Some("Včera běžel domů."))
        .await;

    assert_eq!(lemma, "běžet");
    assert_eq!(model.call_count(), 1);
    assert!(model.call(0).0[1].content.contains("Včera běžel domů."));
    // the context result is never written back
    assert_eq!(
        store.get_cached_lemma("běžel", "Czech").unwrap().as_deref(),
        Some("stale")
    );
}

#[tokio::test]
async fn test_lemma_falls_back_to_the_word() {
    let model = ScriptedModel::new();
    model
        .fail(LlmError::Timeout)
        .reply("...")
        .reply("\"dát se do\".");
    let store = store();
    let service = service(model.clone(), store.clone());

    assert_eq!(service.lemmas().resolve("psa", "Czech", None).await, "psa");
    assert_eq!(store.get_cached_lemma("psa", "Czech").unwrap(), None);

    assert_eq!(service.lemmas().resolve("kočky", "Czech", None).await, "kočky");

    assert_eq!(
        service.lemmas().resolve("dal se do", "Czech", None).await,
        "dát se do"
    );
}

#[tokio::test]
async fn test_fenced_entry_is_parsed_and_stored() {
    let model = ScriptedModel::new();
    model.reply(&format!("```json\n{}\n```", entry_json("ahoj", "hello; hi")));
    let store = store();
    let service = service(model.clone(), store.clone());

    let output = service
        .execute(JobRequest::CreateEntry {
            headword: "ahoj".to_string(),
            languages: czech(),
            sentence_context: None,
        })
        .await
        .unwrap();

    let JobOutput::Entry(entry) = output else {
        panic!("expected an entry, got {output:?}");
    };
    assert!(entry.id.is_some());
    assert_eq!(entry.meanings[0].definition, "hello; hi");
    assert_eq!(entry.metadata.target_language, "Czech");
    assert_eq!(entry.metadata.source_language, "English");
    assert_eq!(entry.metadata.definition_language, "English");
    assert_eq!(model.call(0).1, Some(0.7));

    let stored = store
        .get_entry(&EntryQuery::from(&EntryKey::new("ahoj", &czech())))
        .unwrap()
        .unwrap();
    assert_eq!(stored.meanings, entry.meanings);
}

#[tokio::test]
async fn test_existing_entry_is_returned_without_a_model_call() {
    let model = ScriptedModel::new();
    model.reply(&entry_json("ahoj", "hello"));
    let store = store();
    let service = service(model.clone(), store.clone());

    let request = JobRequest::CreateEntry {
        headword: "ahoj".to_string(),
        languages: czech(),
        sentence_context: None,
    };
    service.execute(request.clone()).await.unwrap();
    let again = service.execute(request).await.unwrap();

    assert_eq!(model.call_count(), 1);
    assert!(matches!(again, JobOutput::Entry(e) if e.meanings[0].definition == "hello"));
}

#[tokio::test]
async fn test_normalized_headword_collision_returns_the_stored_entry() {
    let model = ScriptedModel::new();
    model.reply(&entry_json("dobrý den", "good day"));
    model.reply(&entry_json("dobrý den", "hello, formal"));
    model.reply(&entry_json("dobrý den", "never asked for"));
    let store = store();
    let service = service(model.clone(), store.clone());

    let first = service
        .execute(JobRequest::CreateEntry {
            headword: "dobrý den".to_string(),
            languages: czech(),
            sentence_context: None,
        })
        .await
        .unwrap();
    let JobOutput::Entry(first) = first else {
        panic!("expected an entry");
    };

    // requested under another spelling, the model answers with the stored headword
    let request = JobRequest::CreateEntry {
        headword: "dobry den".to_string(),
        languages: czech(),
        sentence_context: None,
    };
    let second = service.execute(request.clone()).await.unwrap();
    let JobOutput::Entry(second) = second else {
        panic!("expected an entry");
    };
    assert_eq!(second.id, first.id);
    assert_eq!(second.meanings[0].definition, "good day");
    assert_eq!(model.call_count(), 2);

    let stored = store
        .get_entry(&EntryQuery::from(&EntryKey::new("dobrý den", &czech())))
        .unwrap()
        .unwrap();
    assert_eq!(stored.meanings[0].definition, "good day");
}

#[tokio::test]
async fn test_context_entry_records_the_sentence() {
    let model = ScriptedModel::new();
    model.reply(&entry_json("kniha", "book"));
    let store = store();
    let service = service(model.clone(), store.clone());

    let context = SentenceContext::new("Čtu knihu.", "knihu");
    let output = service
        .execute(JobRequest::CreateEntry {
            headword: "kniha".to_string(),
            languages: czech(),
            sentence_context: Some(context.clone()),
        })
        .await
        .unwrap();

    let JobOutput::Entry(entry) = output else {
        panic!("expected an entry");
    };
    assert!(model.call(0).0[0].content.contains("Čtu knihu."));

    let stored = store.get_sentence_context(entry.id.unwrap()).unwrap();
    assert_eq!(stored, Some(context));
}

#[tokio::test]
async fn test_empty_reply_fails_and_stores_nothing() {
    let model = ScriptedModel::new();
    model.reply("   ");
    let store = store();
    let service = service(model.clone(), store.clone());

    let err = service
        .execute(JobRequest::CreateEntry {
            headword: "ahoj".to_string(),
            languages: czech(),
            sentence_context: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, JobError::Synthesis(SynthesisError::EmptyResponse)));
    assert!(store.get_entry(&EntryQuery::headword("ahoj")).unwrap().is_none());
}

#[tokio::test]
async fn test_unparseable_reply_is_a_parse_error() {
    let model = ScriptedModel::new();
    model.reply("Sorry, I don't know this word.");
    let service = service(model, store());

    let err = service
        .execute(JobRequest::CreateEntry {
            headword: "xyz".to_string(),
            languages: czech(),
            sentence_context: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, JobError::Synthesis(SynthesisError::Parse(_))));
}

#[tokio::test]
async fn test_language_validation_caches_successes_only() {
    let model = ScriptedModel::new();
    model
        .fail(LlmError::RateLimitExceeded)
        .reply(r#"{"standardized_name": "Czech", "display_name": "Czech (čeština)"}"#);
    let service = service(model.clone(), store());

    let first = service.validator().validate("cesky").await;
    assert_eq!(first.standardized_name, "cesky");

    let second = service.validator().validate("cesky").await;
    assert_eq!(second.standardized_name, "Czech");
    let third = service.validator().validate("cesky").await;
    assert_eq!(third, second);
    assert_eq!(model.call_count(), 2);
}

/// Lookup of an unknown word through the real queue: one error callback,
/// nothing stored.
#[test]
fn test_failed_lookup_through_the_queue() {
    let model = ScriptedModel::new();
    model.reply("");
    let store = store();
    let service = Arc::new(service(model, store.clone()));

    let config = Config::default();
    let (queue, handoff) = RequestQueue::<Log>::start(service, &config.queue).unwrap();
    queue.add_request(
        JobRequest::CreateEntry {
            headword: "ahoj".to_string(),
            languages: czech(),
            sentence_context: None,
        },
        |log: &mut Log, output| log.outputs.push(output),
        |log: &mut Log, failure| log.failures.push(failure),
    );

    let mut log = Log::default();
    drain_until(&handoff, &mut log, 1, Duration::from_secs(5));
    std::thread::sleep(Duration::from_millis(50));
    handoff.drain(&mut log);

    assert!(log.outputs.is_empty());
    assert_eq!(log.failures.len(), 1);
    assert_eq!(log.failures[0].kind, JobKind::CreateEntry);
    assert!(store.get_entry(&EntryQuery::headword("ahoj")).unwrap().is_none());

    queue.shutdown();
}

/// "running" resolves to "run" on the worker, the lemma comes back on the
/// draining thread, and the entry is then created under the lemma.
#[test]
fn test_inflected_lookup_through_the_queue() {
    let model = ScriptedModel::new();
    model.reply("run");
    model.reply(&entry_json("run", "to move fast on foot"));
    let store = store();
    let service = Arc::new(service(model.clone(), store.clone()));

    let config = Config::default();
    let (queue, handoff) = RequestQueue::<Log>::start(service, &config.queue).unwrap();
    let ui_thread = std::thread::current().id();

    queue.add_request(
        JobRequest::Lemma {
            word: "running".to_string(),
            languages: LanguageSettings::new("English", "English"),
            sentence_context: None,
        },
        move |log: &mut Log, output| {
            assert_eq!(std::thread::current().id(), ui_thread);
            log.outputs.push(output);
        },
        |log: &mut Log, failure| log.failures.push(failure),
    );

    let mut log = Log::default();
    drain_until(&handoff, &mut log, 1, Duration::from_secs(5));
    assert!(log.failures.is_empty());
    assert_eq!(log.lemmas(), vec!["run"]);
    assert_eq!(
        store.get_cached_lemma("running", "English").unwrap().as_deref(),
        Some("run")
    );

    queue.add_request(
        JobRequest::CreateEntry {
            headword: log.lemmas()[0].clone(),
            languages: LanguageSettings::new("English", "English"),
            sentence_context: None,
        },
        move |log: &mut Log, output| {
            assert_eq!(std::thread::current().id(), ui_thread);
            log.outputs.push(output);
        },
        |log: &mut Log, failure| log.failures.push(failure),
    );

    drain_until(&handoff, &mut log, 2, Duration::from_secs(5));
    assert!(log.failures.is_empty());
    let Some(JobOutput::Entry(entry)) = log.outputs.last() else {
        panic!("expected an entry, got {:?}", log.outputs.last());
    };
    assert_eq!(entry.headword, "run");
    assert_eq!(model.call_count(), 2);
    assert!(
        store
            .get_entry(&EntryQuery::headword("run"))
            .unwrap()
            .is_some()
    );

    queue.shutdown();
}
