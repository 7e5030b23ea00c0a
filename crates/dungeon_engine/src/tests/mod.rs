//! Cross-module tests: scenes, the event bus and input working together
