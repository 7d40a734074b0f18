use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub allocation: AllocationConfig,
    #[serde(default)]
    pub rooms: RoomConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// 门店令牌由外部签发, 这里只做校验
    pub secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 开盒事务是否使用 SERIALIZABLE 隔离级别
    /// 默认 READ COMMITTED: 行级条件更新已保证库存/盒子/账户只有一个赢家,
    /// 打开后并发冲突会以数据库错误的形式返回
    #[serde(default)]
    pub serializable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// 活动未配置有效房间大小时使用
    #[serde(default = "default_room_size")]
    pub default_room_size: i64,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_room_size: default_room_size(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    8
}

fn default_room_size() -> i64 {
    100
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                        connect_timeout_secs: get_env_parse(
                            "DB_CONNECT_TIMEOUT",
                            default_connect_timeout(),
                        ),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    allocation: AllocationConfig {
                        serializable: get_env_parse("ALLOCATION_SERIALIZABLE", false),
                    },
                    rooms: RoomConfig {
                        default_room_size: get_env_parse("ROOM_DEFAULT_SIZE", default_room_size()),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("DB_CONNECT_TIMEOUT")
            && let Ok(t) = v.parse()
        {
            config.database.connect_timeout_secs = t;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("ALLOCATION_SERIALIZABLE")
            && let Ok(b) = v.parse()
        {
            config.allocation.serializable = b;
        }
        if let Ok(v) = env::var("ROOM_DEFAULT_SIZE")
            && let Ok(n) = v.parse::<i64>()
            && n > 0
        {
            config.rooms.default_room_size = n;
        }

        Ok(config)
    }
}
