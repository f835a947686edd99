use crate::conf::{Conf, Credentials};
use crate::service::reports::ReportKind;
use crate::{Error, Result};
use serde_json::json;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thirtyfour::prelude::*;
use thirtyfour::Key;
use time::macros::format_description;
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::time::sleep;
use tracing::{info, warn};

pub const LOGIN_URL: &str = "https://v4.evolta.pe/Login/Acceso/Index";

const DOWNLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DOWNLOAD_SETTLE: Duration = Duration::from_secs(2);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);
const REPORT_PAUSE: Duration = Duration::from_secs(3);

// Partially written downloads show up under transient names
const TRANSIENT_SUFFIXES: [&str; 2] = [".crdownload", ".tmp"];

pub fn report_url(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Prospectos => "https://v4.evolta.pe/Reportes/RepHiloProspectos/IndexProspecto",
        ReportKind::Ventas => "https://v4.evolta.pe/Reportes/RepVenta/Index",
        ReportKind::Separaciones => "https://v4.evolta.pe/Reportes/RepSeparacion/Index",
        ReportKind::Visitas => "https://v4.evolta.pe/Reportes/RepVisita/IndexVisita",
    }
}

/// Exports all four reports into the download directory through one browser
/// session. A single report failing is logged and skipped, so partial success
/// is the normal terminal state. Only a session that never authenticates
/// aborts the whole run.
pub async fn synchronize(conf: &Conf, creds: &Credentials) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&conf.download_dir)?;
    info!(download_dir = %conf.download_dir.display(), "Starting report sync");

    let driver = start_session(conf).await?;
    let res = run_exports(&driver, conf, creds).await;
    // the session holds portal auth state and must always be released
    if let Err(e) = driver.quit().await {
        warn!(error = e.to_string(), "Failed to quit browser session");
    }
    res
}

async fn run_exports(
    driver: &WebDriver,
    conf: &Conf,
    creds: &Credentials,
) -> Result<Vec<PathBuf>> {
    login(driver, &conf.download_dir, creds).await?;

    let mut saved = vec![];
    for kind in ReportKind::ALL {
        info!(report = kind.to_string(), "Exporting report");
        match export_report(driver, &conf.download_dir, kind).await {
            Ok(path) => {
                info!(report = kind.to_string(), path = %path.display(), "Report saved");
                saved.push(path);
            }
            Err(e) => {
                warn!(
                    report = kind.to_string(),
                    error = e.to_string(),
                    "Report export failed, continuing with the next one"
                );
                save_screenshot(driver, &conf.download_dir, &format!("error_{kind}")).await;
            }
        }
        sleep(REPORT_PAUSE).await;
    }

    info!(
        downloaded = saved.len(),
        total = ReportKind::ALL.len(),
        "Report sync finished"
    );
    Ok(saved)
}

async fn start_session(conf: &Conf) -> Result<WebDriver> {
    let mut caps = DesiredCapabilities::chrome();
    if conf.production {
        caps.set_headless()?;
        caps.set_disable_dev_shm_usage()?;
        if let Some(binary) = &conf.chrome_binary {
            caps.set_binary(binary)?;
        }
    }
    caps.set_no_sandbox()?;
    caps.set_disable_gpu()?;
    caps.add_arg("--disable-popup-blocking")?;
    caps.add_arg("--window-size=1920,1080")?;
    let download_dir = fs::canonicalize(&conf.download_dir)?;
    caps.add_experimental_option(
        "prefs",
        json!({
            "download.default_directory": download_dir.to_string_lossy(),
            "download.prompt_for_download": false,
            "download.directory_upgrade": true,
            "safebrowsing.enabled": true,
            "profile.default_content_setting_values.automatic_downloads": 1,
        }),
    )?;
    let driver = WebDriver::new(&conf.webdriver_url, caps).await?;
    info!("Browser session started");
    Ok(driver)
}

/// The login form carries no stable ids, so the user field is located through
/// a chain of selectors, first match wins
async fn login(driver: &WebDriver, download_dir: &Path, creds: &Credentials) -> Result<()> {
    driver.goto(LOGIN_URL).await?;
    sleep(Duration::from_secs(2)).await;

    let user_field = find_first(
        driver,
        &[
            By::Id("UserName"),
            By::Name("Usuario"),
            By::XPath("//input[@type='text']"),
        ],
    )
    .await;
    let Some(user_field) = user_field else {
        save_screenshot(driver, download_dir, "error_login").await;
        return Err(Error::Portal("Login form not found".into()));
    };
    user_field.clear().await?;
    user_field.send_keys(&creds.username).await?;

    let pass_field = driver.find(By::XPath("//input[@type='password']")).await?;
    pass_field.send_keys(&creds.password).await?;

    match driver
        .find(By::XPath("//button[@type='submit'] | //input[@type='submit']"))
        .await
    {
        Ok(submit) => submit.click().await?,
        Err(_) => pass_field.send_keys(Key::Enter + "").await?,
    }

    sleep(Duration::from_secs(3)).await;
    dismiss_popup(driver).await;

    let url = driver.current_url().await?;
    if url.as_str().contains("Login") {
        save_screenshot(driver, download_dir, "error_login").await;
        return Err(Error::Portal(format!("Login failed, still at {url}")));
    }
    info!(url = url.as_str(), "Logged in to portal");
    Ok(())
}

async fn export_report(driver: &WebDriver, dir: &Path, kind: ReportKind) -> Result<PathBuf> {
    let files_before = existing_files(dir)?;

    driver.goto(report_url(kind)).await?;
    sleep(Duration::from_secs(3)).await;
    dismiss_popup(driver).await;

    // zoom out so the export controls stay in the viewport
    driver
        .execute("document.body.style.zoom='70%'", vec![])
        .await?;

    select_all_projects(driver).await;
    set_date_range(driver).await?;
    sleep(Duration::from_secs(1)).await;

    driver
        .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
        .await?;
    sleep(Duration::from_secs(1)).await;

    if !click_export(driver).await? {
        return Err(Error::Portal(format!(
            "No export control found at {}",
            report_url(kind)
        )));
    }

    let new_file = wait_for_new_file(dir, &files_before, DOWNLOAD_TIMEOUT).await?;
    let Some(new_file) = new_file else {
        return Err(Error::Portal(format!(
            "Timed out waiting for {kind} download"
        )));
    };

    // give the browser a moment to release the file handle
    sleep(Duration::from_secs(1)).await;
    Ok(finalize_download(dir, kind.file_prefix(), &new_file))
}

/// Returns the first element any of the locators resolves to
async fn find_first(driver: &WebDriver, locators: &[By]) -> Option<WebElement> {
    for locator in locators {
        if let Ok(element) = driver.find(locator.clone()).await {
            return Some(element);
        }
    }
    None
}

async fn dismiss_popup(driver: &WebDriver) {
    if let Ok(body) = driver.find(By::Tag("body")).await {
        let _ = body.send_keys(Key::Escape + "").await;
        sleep(Duration::from_millis(500)).await;
    }
}

/// Selects the "all projects" option in the report filter, when present
async fn select_all_projects(driver: &WebDriver) {
    let script = r#"
        var selects = document.getElementsByTagName('select');
        if (selects.length > 0) {
            selects[0].selectedIndex = 0;
            selects[0].dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }
        return false;
    "#;
    match driver.execute(script, vec![]).await {
        Ok(ret) => {
            if !ret.json().as_bool().unwrap_or(false) {
                warn!("No project selector found");
            }
        }
        Err(e) => warn!(error = e.to_string(), "Project selection failed"),
    }
}

/// Sets the report range to [first day of the current month, yesterday]. The
/// portal's date field ids aren't stable, so candidates are detected by value
/// shape, placeholder or input type.
async fn set_date_range(driver: &WebDriver) -> Result<()> {
    let today = OffsetDateTime::now_utc().date();
    let format = format_description!("[day]/[month]/[year]");
    let first_day = today.replace_day(1)?.format(&format)?;
    let yesterday = (today - TimeDuration::days(1)).format(&format)?;
    info!(first_day, yesterday, "Setting report date range");

    let script = r#"
        var first = arguments[0];
        var last = arguments[1];
        var inputs = document.querySelectorAll('input');
        var dateInputs = [];
        for (var i = 0; i < inputs.length; i++) {
            var val = inputs[i].value || '';
            var placeholder = (inputs[i].placeholder || '').toLowerCase();
            if (/\d{2}\/\d{2}\/\d{4}/.test(val) || placeholder.indexOf('fecha') >= 0 || inputs[i].type === 'date') {
                dateInputs.push(inputs[i]);
            }
        }
        if (dateInputs.length >= 2) {
            dateInputs[0].value = first;
            dateInputs[1].value = last;
            dateInputs[0].dispatchEvent(new Event('change', { bubbles: true }));
            dateInputs[1].dispatchEvent(new Event('change', { bubbles: true }));
            return true;
        }
        return false;
    "#;
    let ret = driver
        .execute(script, vec![json!(first_day), json!(yesterday)])
        .await?;
    if !ret.json().as_bool().unwrap_or(false) {
        warn!("Date fields not detected, exporting with the portal defaults");
    }
    sleep(Duration::from_secs(1)).await;
    Ok(())
}

/// Tries every known way to trigger the export, in order. The portal has no
/// automation contract, so each strategy is independent and the first one
/// that clicks wins.
async fn click_export(driver: &WebDriver) -> Result<bool> {
    let strategies = [
        By::Id("btnExportar"),
        By::XPath("//button[contains(text(),'Exportar')]"),
        By::XPath("//button[contains(text(),'EXPORTAR')]"),
        By::XPath("//input[@value='Exportar']"),
        By::XPath("//a[contains(text(),'Exportar')]"),
    ];
    for strategy in strategies {
        let Ok(element) = driver.find(strategy.clone()).await else {
            continue;
        };
        let clicked = driver
            .execute(
                "arguments[0].scrollIntoView({block: 'center'}); arguments[0].click();",
                vec![element.to_json()?],
            )
            .await;
        match clicked {
            Ok(_) => {
                info!(strategy = ?strategy, "Export triggered");
                return Ok(true);
            }
            Err(e) => {
                warn!(strategy = ?strategy, error = e.to_string(), "Export click failed");
            }
        }
    }
    Ok(false)
}

/// Snapshot of settled file names in the download directory. Names with a
/// transient in-progress suffix don't count as existing.
pub fn existing_files(dir: &Path) -> Result<HashSet<OsString>> {
    let mut files = HashSet::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let transient = name
            .to_str()
            .map(|it| TRANSIENT_SUFFIXES.iter().any(|suffix| it.ends_with(suffix)))
            .unwrap_or(false);
        if !transient {
            files.insert(name);
        }
    }
    Ok(files)
}

/// Waits for a file that wasn't in the pre-export snapshot. The filesystem is
/// the only completion signal the portal gives us, and a name can appear
/// while the browser is still writing, so the first sighting is settled and
/// re-checked before it counts.
pub async fn wait_for_new_file(
    dir: &Path,
    files_before: &HashSet<OsString>,
    timeout: Duration,
) -> Result<Option<PathBuf>> {
    let started = Instant::now();
    while started.elapsed() < timeout {
        let current = existing_files(dir)?;
        if current.difference(files_before).next().is_some() {
            sleep(DOWNLOAD_SETTLE).await;
            let current = existing_files(dir)?;
            if let Some(name) = current.difference(files_before).next() {
                info!(file = ?name, "New file detected");
                return Ok(Some(dir.join(name)));
            }
        }
        sleep(DOWNLOAD_POLL_INTERVAL).await;
    }
    warn!("Timed out waiting for a new file");
    Ok(None)
}

/// Moves a finished download to its canonical `{prefix}.{ext}` name. An
/// existing target is deleted first, a timestamped name is used when the
/// deletion fails, and when even the move fails the download keeps its
/// original name, which is still a usable result.
pub fn finalize_download(dir: &Path, prefix: &str, downloaded: &Path) -> PathBuf {
    let ext = downloaded
        .extension()
        .and_then(|it| it.to_str())
        .unwrap_or("xlsx")
        .to_string();
    let mut target = dir.join(format!("{prefix}.{ext}"));

    if downloaded == target {
        return target;
    }

    if target.exists() {
        if let Err(e) = fs::remove_file(&target) {
            warn!(target = %target.display(), error = e.to_string(), "Can't remove existing file");
            let format = format_description!("[hour][minute][second]");
            let suffix = OffsetDateTime::now_utc()
                .time()
                .format(&format)
                .unwrap_or_default();
            target = dir.join(format!("{prefix}_{suffix}.{ext}"));
        }
    }

    match fs::rename(downloaded, &target) {
        Ok(()) => target,
        Err(e) => {
            warn!(
                from = %downloaded.display(),
                to = %target.display(),
                error = e.to_string(),
                "Can't rename download, keeping the original name"
            );
            downloaded.to_path_buf()
        }
    }
}

async fn save_screenshot(driver: &WebDriver, dir: &Path, name: &str) {
    let format = format_description!("[hour][minute][second]");
    let suffix = OffsetDateTime::now_utc()
        .time()
        .format(&format)
        .unwrap_or_default();
    let path = dir.join(format!("{name}_{suffix}.png"));
    match driver.screenshot(&path).await {
        Ok(()) => info!(path = %path.display(), "Saved screenshot"),
        Err(e) => warn!(error = e.to_string(), "Failed to save screenshot"),
    }
}

#[cfg(test)]
mod test {
    use super::existing_files;
    use crate::Result;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn existing_files_skips_transient_downloads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("ReporteVenta.xlsx"), "data")?;
        fs::write(dir.path().join("export.xlsx.crdownload"), "partial")?;
        fs::write(dir.path().join("export.tmp"), "partial")?;
        let files = existing_files(dir.path())?;
        assert_eq!(1, files.len());
        assert!(files.contains(&std::ffi::OsString::from("ReporteVenta.xlsx")));
        Ok(())
    }

    #[actix_web::test]
    async fn wait_for_new_file_times_out() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("old.xlsx"), "data")?;
        let before = existing_files(dir.path())?;
        let found =
            super::wait_for_new_file(dir.path(), &before, Duration::from_millis(50)).await?;
        assert!(found.is_none());
        Ok(())
    }

    #[actix_web::test]
    async fn wait_for_new_file_detects_late_arrival() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("old.xlsx"), "data")?;
        let before = existing_files(dir.path())?;
        let path = dir.path().join("fresh.xlsx");
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            fs::write(path, "data").unwrap();
        });
        let found = super::wait_for_new_file(dir.path(), &before, Duration::from_secs(30)).await?;
        writer.await.unwrap();
        assert_eq!(
            Some("fresh.xlsx"),
            found
                .as_deref()
                .and_then(|it| it.file_name())
                .and_then(|it| it.to_str()),
        );
        Ok(())
    }

    #[test]
    fn finalize_download_renames_to_prefix() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let downloaded = dir.path().join("Reporte de Ventas (3).xlsx");
        fs::write(&downloaded, "data")?;
        let target = super::finalize_download(dir.path(), "ReporteVenta", &downloaded);
        assert_eq!(dir.path().join("ReporteVenta.xlsx"), target);
        assert!(target.exists());
        assert!(!downloaded.exists());
        Ok(())
    }

    #[test]
    fn finalize_download_replaces_existing_target() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("ReporteVenta.xlsx"), "stale")?;
        let downloaded = dir.path().join("export.xlsx");
        fs::write(&downloaded, "fresh")?;
        let target = super::finalize_download(dir.path(), "ReporteVenta", &downloaded);
        assert_eq!(dir.path().join("ReporteVenta.xlsx"), target);
        assert_eq!("fresh", fs::read_to_string(target)?);
        Ok(())
    }

    #[test]
    fn finalize_download_keeps_canonical_name() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let downloaded = dir.path().join("ReporteVenta.xlsx");
        fs::write(&downloaded, "data")?;
        let target = super::finalize_download(dir.path(), "ReporteVenta", &downloaded);
        assert_eq!(downloaded, target);
        assert!(target.exists());
        Ok(())
    }
}
