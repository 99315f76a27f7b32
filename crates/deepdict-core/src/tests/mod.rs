mod lookup_tests;
mod support;
