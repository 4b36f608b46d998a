//! Error handling utilities

use tracing::error;

use crate::app::config::ConfigError;
use crate::error::DetectionError;

/// Exit code for invalid configuration or arguments
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for a detection that failed because of its input
pub const EXIT_DETECTION: i32 = 3;

/// Exit code for an error chain
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ConfigError>().is_some() {
        EXIT_CONFIG
    } else if let Some(detection) = error.downcast_ref::<DetectionError>() {
        if detection.tag().is_user_error() {
            EXIT_DETECTION
        } else {
            1
        }
    } else {
        1
    }
}

/// Handle fatal errors and exit with appropriate status code
///
/// Detection errors print their user message; `-v` adds the cause chain.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {:#}", error);

    if let Some(detection) = error.downcast_ref::<DetectionError>() {
        eprintln!("{} ({})", detection, detection.tag());
        if verbose >= 1 {
            eprintln!("\nContext Chain:\n{}", detection.developer_message());
        }
    } else {
        eprintln!("Error: {error}");
        if verbose >= 1 {
            eprintln!("\nError chain:");
            for (i, cause) in error.chain().enumerate() {
                eprintln!("  {}: {}", i, cause);
            }
        }
    }

    std::process::exit(exit_code(&error))
}
