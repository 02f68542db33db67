/// Persistance des résultats de cycle (tables CSV).

pub mod csv_report;

pub use csv_report::CsvReporter;
