pub mod decryptor;
pub mod document_verifier;
pub mod mailer;
pub mod workspace;

pub use decryptor::{Decryptor, QpdfDecryptor};
pub use document_verifier::{find_verified_document, is_valid_document};
pub use mailer::{NotificationDispatcher, PaycheckMail, SmtpMailer};
pub use workspace::{Workspace, WorkspaceManager};
