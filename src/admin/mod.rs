pub mod dashboard;
pub mod form;
pub mod login;
pub mod service;
pub mod upload;

pub use dashboard::{table_rows, AdminTableRow, InventorySummary};
pub use form::{ImageSelection, ListingDraft, ListingForm, NewImage};
pub use login::{AuthState, LoginForm};
pub use service::{delete_prompt, AdminService};
pub use upload::{object_name, upload_images};
