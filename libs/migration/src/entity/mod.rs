pub mod announcements;
pub mod category_templates;
pub mod migration_versions;
