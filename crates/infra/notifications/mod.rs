pub mod logging_notifier;
