use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::config::StoreBackend;
use crate::core::{Config, Result};
use crate::db::{ImageStore, MemoryImageStore, PgImageStore};
use crate::services::GalleryService;
use crate::storage::{ImageStorage, LocalImageStorage};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，作为 axum 的 `State` 注入每个处理函数。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | gallery | Arc<GalleryService> | 图库用例 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub gallery: Arc<GalleryService>,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 手动构造 (测试中注入内存实现)
    pub fn new(config: Config, gallery: GalleryService, jwt_service: JwtService) -> Self {
        Self {
            config,
            gallery: Arc::new(gallery),
            jwt_service: Arc::new(jwt_service),
        }
    }

    /// 按配置初始化存储后端和各项服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn ImageStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(crate::core::error::ConfigError::Missing("DATABASE_URL"))?;
                Arc::new(PgImageStore::connect(url, config.db_max_connections).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory image store, data is lost on restart");
                Arc::new(MemoryImageStore::new())
            }
        };

        let images_dir = config.images_dir();
        tokio::fs::create_dir_all(&images_dir).await?;
        let storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStorage::with_max_size(
            images_dir,
            config.max_upload_bytes,
        ));

        let gallery = GalleryService::new(store, storage);
        let jwt_service = JwtService::with_config(config.jwt.clone());

        tracing::info!(
            backend = ?config.store_backend,
            work_dir = %config.work_dir,
            "Server state initialized"
        );
        Ok(Self::new(config.clone(), gallery, jwt_service))
    }

    pub fn gallery(&self) -> &GalleryService {
        &self.gallery
    }

    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }
}
