pub mod assertions;
pub mod fake_engine;
pub mod inspect_reports;
