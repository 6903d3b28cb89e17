use notify::{EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    AppConfig,
    GameList,
}

/// Watches the directories holding the app config and the game list, and
/// reports changes to either file.
pub fn start_config_watcher(app_config: PathBuf, gamelist: PathBuf) -> mpsc::Receiver<WatchEvent> {
    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>(10);

    std::thread::spawn(move || {
        let tx = watch_tx;
        let targets = [
            (app_config.clone(), WatchEvent::AppConfig),
            (gamelist.clone(), WatchEvent::GameList),
        ];

        let mut watcher = match notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| {
                let Ok(event) = res else {
                    return;
                };
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                for (path, kind) in &targets {
                    if event.paths.iter().any(|p| same_file_name(p, path)) {
                        debug!(target: "azenith::watcher", "{} changed", path.display());
                        let _ = tx.blocking_send(*kind);
                    }
                }
            },
        ) {
            Ok(w) => w,
            Err(e) => {
                error!(target: "azenith::watcher", "Failed to create config watcher: {}", e);
                return;
            }
        };

        let mut watched = 0;
        for path in [&app_config, &gamelist] {
            let Some(dir) = path.parent() else {
                continue;
            };
            match watcher.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => watched += 1,
                Err(e) => warn!(target: "azenith::watcher", "Cannot watch {}: {}", dir.display(), e),
            }
        }
        if watched == 0 {
            error!(target: "azenith::watcher", "No config directory could be watched");
            return;
        }

        info!(target: "azenith::watcher", "Config file watchers started");
        loop {
            std::thread::sleep(std::time::Duration::from_secs(3600));
        }
    });

    watch_rx
}

fn same_file_name(changed: &Path, target: &Path) -> bool {
    changed.file_name().is_some() && changed.file_name() == target.file_name()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_file_name() {
        let target = Path::new("/data/adb/.config/AZenith/gamelist/azenithApplist.json");
        assert!(same_file_name(
            Path::new("/data/adb/.config/AZenith/gamelist/azenithApplist.json"),
            target
        ));
        assert!(!same_file_name(Path::new("/data/adb/.config/AZenith/gamelist/other.json"), target));
        assert!(!same_file_name(Path::new("/"), target));
    }

    #[tokio::test]
    async fn reports_gamelist_writes() {
        let dir = tempfile::tempdir().unwrap();
        let app_config = dir.path().join("azenithApplist.json");
        let gamelist = dir.path().join("gamelist.txt");

        let mut rx = start_config_watcher(app_config, gamelist.clone());
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        std::fs::write(&gamelist, "com.a|com.b").unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                match rx.recv().await {
                    Some(WatchEvent::GameList) => break Some(WatchEvent::GameList),
                    Some(_) => continue,
                    None => break None,
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(event, Some(WatchEvent::GameList));
    }
}
