//! EST Verify Common Library
//!
//! CLIとフォルダ監視で共有されるログ解析・マスタ照合のコア
//!
//! ```
//! use est_verify_common::normalize_serial;
//!
//! assert_eq!(normalize_serial("PUMP-0042"), "0042");
//! ```

pub mod error;
pub mod serial;
pub mod table;
pub mod types;
pub mod record;
pub mod log_reader;
pub mod master;
pub mod verifier;

pub use error::{Error, Result};
pub use serial::{
    normalize_serial, sanitize_for_path, serials_match, truncate_serial, MAX_SERIAL_FILE_LEN,
};
pub use types::{LogFormat, MasterEntry, Outcome, ParameterOutcome, VerificationResult};
pub use record::{LogEntry, LogMetadata, LogRecord, RecordBuilder, NORMALIZED_HEADER};
pub use log_reader::{detect_format, parse_as, read_log, FormatHint};
pub use master::{MasterIndex, MasterStats, REQUIRED_COLUMNS};
pub use verifier::{verify, ComparePolicy, Tolerance};
