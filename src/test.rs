use crate::conf::Conf;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

static MEM_DB_COUNTER: AtomicUsize = AtomicUsize::new(1);

pub fn mock_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    crate::db::migrate(&mut conn).unwrap();
    conn
}

pub async fn mock_pool() -> Pool {
    let uri = format!(
        "file:testdb_{}?mode=memory&cache=shared",
        MEM_DB_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let pool = Config::new(uri).create_pool(Runtime::Tokio1).unwrap();
    pool.get()
        .await
        .unwrap()
        .interact(|conn| crate::db::migrate(conn))
        .await
        .unwrap()
        .unwrap();
    pool
}

pub fn mock_conf(download_dir: &Path) -> Conf {
    Conf {
        download_dir: download_dir.to_path_buf(),
        data_dir: None,
        webdriver_url: "http://localhost:9515".into(),
        production: false,
        chrome_binary: None,
        allowed_origins: vec!["http://localhost:5173".into()],
    }
}
