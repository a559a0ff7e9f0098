//! 服务层
//!
//! - [`GalleryService`] - 图库用例 (上传、查询、编辑、删除、排序)

pub mod gallery;

pub use gallery::{FilePart, GalleryService, UploadFile, UploadForm};
