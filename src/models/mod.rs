pub mod admin;
pub mod column;
pub mod course;

pub use admin::Admin;
pub use column::{ColumnSetting, ColumnSettingPatch, ColumnSettingUpdate};
pub use course::{AttributeBag, CourseRow, attribute_text};
