use std::path::PathBuf;

use crate::auth::JwtConfig;
use crate::core::error::ConfigError;
use crate::storage::MAX_FILE_SIZE;

/// development 环境下未设置 JWT_SECRET 时使用
const DEV_JWT_SECRET: &str = "dev-JWT_SECRET-not-for-production";

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// 服务器配置
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | ENVIRONMENT | development | 运行环境 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | WORK_DIR | ./data | 工作目录 (图片、日志) |
/// | STORE_BACKEND | postgres | postgres / memory |
/// | DATABASE_URL | - | postgres 后端必填 |
/// | DB_MAX_CONNECTIONS | 10 | 连接池大小 |
/// | JWT_SECRET | - | 非 development 环境必填 |
/// | JWT_EXPIRATION_MINUTES | 1440 | 令牌有效期 |
/// | JWT_ISSUER / JWT_AUDIENCE | gallery-server / gallery-clients | 令牌校验 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | - | 设置后按天滚动写文件 |
/// | MAX_UPLOAD_BYTES | 5242880 | 单个文件上限 |
/// | MAX_REQUEST_BYTES | 52428800 | 单个请求体上限 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// STORE_BACKEND=memory WORK_DIR=/tmp/gallery HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 运行环境: development | staging | production
    pub environment: String,
    pub http_port: u16,
    pub work_dir: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub max_upload_bytes: usize,
    pub max_request_bytes: usize,
    pub request_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 从任意键值来源加载 (测试用)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let var_or = |name: &str, default: &str| var(name).unwrap_or_else(|| default.to_string());

        let environment = var_or("ENVIRONMENT", "development");

        let store_backend: StoreBackend = var_or("STORE_BACKEND", "postgres").parse()?;
        let database_url = var("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let secret = Self::require_secret(&var, "JWT_SECRET", &environment)?;
        let mut jwt = JwtConfig::new(secret);
        jwt.expiration_minutes = parse_var(&var, "JWT_EXPIRATION_MINUTES", 1440)?;
        if let Some(issuer) = var("JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        if let Some(audience) = var("JWT_AUDIENCE") {
            jwt.audience = audience;
        }

        Ok(Self {
            http_port: parse_var(&var, "HTTP_PORT", 3000)?,
            work_dir: var_or("WORK_DIR", "./data"),
            store_backend,
            database_url,
            db_max_connections: parse_var(&var, "DB_MAX_CONNECTIONS", 10)?,
            jwt,
            log_level: var_or("LOG_LEVEL", "info"),
            log_json: parse_var(&var, "LOG_JSON", false)?,
            log_dir: var("LOG_DIR"),
            max_upload_bytes: parse_var(&var, "MAX_UPLOAD_BYTES", MAX_FILE_SIZE)?,
            max_request_bytes: parse_var(&var, "MAX_REQUEST_BYTES", 10 * MAX_FILE_SIZE)?,
            request_timeout_ms: parse_var(&var, "REQUEST_TIMEOUT_MS", 30_000)?,
            environment,
        })
    }

    /// 非 development 环境下密钥必须设置
    fn require_secret(
        var: &impl Fn(&str) -> Option<String>,
        name: &'static str,
        environment: &str,
    ) -> Result<String, ConfigError> {
        match var(name) {
            Some(secret) => Ok(secret),
            None if environment == "development" => Ok(DEV_JWT_SECRET.to_string()),
            None => Err(ConfigError::Missing(name)),
        }
    }

    /// 是否使用了开发环境的默认密钥
    pub fn uses_development_secret(&self) -> bool {
        self.jwt.secret == DEV_JWT_SECRET
    }

    /// 图片目录: `{work_dir}/images`
    pub fn images_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("images")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}
