mod filename;
mod store;

pub use filename::secure_filename;
pub use filename::storage_name;
pub use filename::CollisionPolicy;
pub use filename::FilenameError;
pub use filename::StoredName;
pub use store::UploadStore;
