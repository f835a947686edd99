use crate::conf::Conf;
use crate::Result;
use deadpool_sqlite::{Config, Pool, Runtime};
use include_dir::{include_dir, Dir};
use rusqlite::Connection;
use std::fs::{create_dir_all, remove_file};
use std::path::PathBuf;
use tracing::{info, warn};

pub mod goal;
pub mod sync_status;

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

const DB_FILE_NAME: &str = "semaforo.db";

pub fn pool(conf: &Conf) -> Result<Pool> {
    Ok(Config::new(db_file_path(conf)?).create_pool(Runtime::Tokio1)?)
}

pub fn open_connection(conf: &Conf) -> Result<Connection> {
    let conn = Connection::open(db_file_path(conf)?)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

pub fn db_file_path(conf: &Conf) -> Result<PathBuf> {
    #[allow(deprecated)]
    let home_dir = std::env::home_dir();
    let data_dir = match &conf.data_dir {
        Some(dir) => dir.clone(),
        None => home_dir
            .ok_or("Home directory does not exist")?
            .join(".local/share/semaforo"),
    };
    if !data_dir.exists() {
        create_dir_all(&data_dir)?;
    }
    Ok(data_dir.join(DB_FILE_NAME))
}

pub fn migrate(conn: &mut Connection) -> Result<()> {
    let mut schema_ver: i16 =
        conn.query_row("SELECT user_version FROM pragma_user_version", [], |row| {
            row.get(0)
        })?;

    loop {
        let file_name = format!("{}.sql", schema_ver + 1);
        let file = MIGRATIONS_DIR.get_file(&file_name);
        match file {
            Some(file) => {
                warn!(file_name, "Found new migration");
                let sql = file
                    .contents_utf8()
                    .ok_or(format!("Can't read {file_name} in UTF-8"))?;
                let tx = conn.transaction()?;
                tx.execute_batch(sql)?;
                tx.execute_batch(&format!("PRAGMA user_version={}", schema_ver + 1))?;
                tx.commit()?;
                schema_ver += 1;
            }
            None => {
                break;
            }
        }
    }

    info!(schema_ver, "Database schema is up to date");

    Ok(())
}

pub fn cli(args: &[String], conf: &Conf) -> Result<()> {
    match args.first().map(|it| it.as_str()) {
        Some("migrate") => {
            let mut conn = open_connection(conf)?;
            migrate(&mut conn)
        }
        Some("drop") => {
            let path = db_file_path(conf)?;
            if !path.exists() {
                Err(format!("Database does not exist at {}", path.display()))?
            }
            remove_file(&path)?;
            info!(path = %path.display(), "Database file was removed");
            Ok(())
        }
        Some(first_arg) => Err(format!("Unknown db action: {first_arg}"))?,
        None => Err("No db actions passed")?,
    }
}
