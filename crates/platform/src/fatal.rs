//! Fatal error reporting.
//!
//! Every error the renderer detects is unrecoverable by policy: the failing
//! operation is named in a message shown to the user, then the process exits
//! with a nonzero status. There is no retry and no degraded mode.

use tracing::error;

/// Display a fatal error to the user and terminate the process.
///
/// The message is logged first so it also lands in the diagnostic stream
/// when no display server is available for the dialog.
pub fn report_fatal(message: &str) -> ! {
    error!("{}", message);

    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();

    std::process::exit(1);
}
