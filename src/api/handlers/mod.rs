mod admin;
mod blobs;
mod files;

pub use admin::health;
pub use blobs::serve_blob;
pub use files::{
    create_file, delete_file, download_file, list_files, list_starred_files, rename_file,
    replace_file, star_file, unstar_file, view_blob,
};
