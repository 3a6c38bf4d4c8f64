//! Response decoder module
//!
//! Extracts the nested record array and the completion flag from a data
//! endpoint response. The default paths match the employee master payload:
//!
//! ```text
//! {
//!   "root": { "EmployeeMaster": { "EmployeeMasterData": [
//!       { "BasicDetails": { "BasicDetail": { "EmpCode": "E1", ... } } }
//!   ] } },
//!   "isLoadComplete": false
//! }
//! ```

mod decoders;
mod types;

pub use decoders::{resolve_path, PageDecoder};
pub use types::Page;
