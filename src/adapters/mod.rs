// Adapters layer: concrete ordered-units sources behind the OrderedUnitsSource port.

pub mod csv_file;
pub mod http;
pub mod memory;

pub use csv_file::CsvOrderedUnits;
pub use http::HttpOrderedUnits;
pub use memory::InMemoryOrderedUnits;
