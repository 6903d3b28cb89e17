use super::cache::StatusCache;
use super::task::ThrottledTask;
use crate::common::{API_DIR, ProfileMode, SERVICE_PROCESS, ServiceState, VALUE_DIR};
use crate::core::channel::{PrivilegedChannel, run_checked};
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Staged-init group a probe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FirstPaint,
    Quick,
    HeavyAsync,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Service,
    Profile,
    Soc,
    Resolution,
    Command(&'static str),
    /// `1`/`0` switch file under the value directory.
    Flag(&'static str),
    /// Raw value file under the value directory.
    Value(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSpec {
    pub key: &'static str,
    pub stage: Stage,
    /// Polling interval for monitored probes; `None` for fetch-once probes.
    pub periodic_ms: Option<u64>,
    pub kind: ProbeKind,
}

const fn probe(key: &'static str, stage: Stage, kind: ProbeKind) -> ProbeSpec {
    ProbeSpec {
        key,
        stage,
        periodic_ms: None,
        kind,
    }
}

pub const PROBES: &[ProbeSpec] = &[
    ProbeSpec {
        key: "service",
        stage: Stage::FirstPaint,
        periodic_ms: Some(5000),
        kind: ProbeKind::Service,
    },
    ProbeSpec {
        key: "profile",
        stage: Stage::FirstPaint,
        periodic_ms: Some(5000),
        kind: ProbeKind::Profile,
    },
    probe("soc", Stage::Quick, ProbeKind::Soc),
    probe("kernel", Stage::Quick, ProbeKind::Command("uname -r")),
    probe("android", Stage::Quick, ProbeKind::Command("getprop ro.build.version.release")),
    probe("lite_mode", Stage::Quick, ProbeKind::Flag("cpulimit")),
    probe("iosched", Stage::HeavyAsync, ProbeKind::Value("iosched")),
    probe("game_preload", Stage::HeavyAsync, ProbeKind::Flag("APreload")),
    probe("ai", Stage::Sequential, ProbeKind::Flag("AIenabled")),
    probe("thermal_core", Stage::Sequential, ProbeKind::Flag("thermalcore")),
    probe("dnd", Stage::Sequential, ProbeKind::Flag("dnd")),
    probe("jit", Stage::Sequential, ProbeKind::Flag("justintime")),
    probe("toast", Stage::Sequential, ProbeKind::Flag("showtoast")),
    probe("sfl", Stage::Sequential, ProbeKind::Flag("SFL")),
    probe("logger", Stage::Sequential, ProbeKind::Flag("debugmode")),
    probe("ram_boost", Stage::Sequential, ProbeKind::Flag("clearbg")),
    probe("resolution", Stage::Sequential, ProbeKind::Resolution),
];

#[derive(Debug, Clone)]
pub struct ProbePaths {
    pub value_dir: String,
    pub api_dir: String,
}

impl Default for ProbePaths {
    fn default() -> Self {
        Self {
            value_dir: VALUE_DIR.to_string(),
            api_dir: API_DIR.to_string(),
        }
    }
}

pub struct ProbeContext {
    pub channel: Arc<dyn PrivilegedChannel>,
    pub paths: ProbePaths,
}

impl ProbeContext {
    async fn read_in(&self, dir: &str, name: &str) -> Result<String> {
        let path = format!("{}/{}", dir, name);
        self.channel
            .read_file(&path)
            .await?
            .map(|s| s.trim().to_string())
            .with_context(|| format!("{} not found", path))
    }

    async fn read_value(&self, name: &str) -> Result<String> {
        self.read_in(&self.paths.value_dir, name).await
    }

    async fn read_api(&self, name: &str) -> Result<String> {
        self.read_in(&self.paths.api_dir, name).await
    }
}

impl ProbeSpec {
    pub fn into_task(
        self,
        ctx: Arc<ProbeContext>,
        cache: StatusCache,
        interval: Duration,
    ) -> ThrottledTask {
        let kind = self.kind;
        ThrottledTask::new(self.key, interval, cache, move || {
            let ctx = ctx.clone();
            async move { kind.fetch(&ctx).await }
        })
    }
}

impl ProbeKind {
    pub async fn fetch(self, ctx: &ProbeContext) -> Result<String> {
        match self {
            Self::Service => Ok(fetch_service(ctx).await?.to_string()),
            Self::Profile => {
                let raw = ctx.read_api("current_profile").await?;
                let lite = matches!(ctx.read_value("cpulimit").await.as_deref(), Ok("1"));
                Ok(profile_label(&raw, lite))
            }
            Self::Soc => {
                let raw = run_checked(&*ctx.channel, "getprop ro.soc.model").await?;
                let model = normalize_soc(&raw);
                if model.is_empty() {
                    bail!("empty SoC model");
                }
                Ok(model)
            }
            Self::Resolution => {
                let out = run_checked(&*ctx.channel, "wm size").await?;
                let res = parse_resolution(&out).context("no resolution in `wm size` output")?;
                Ok(resolution_summary(res))
            }
            Self::Command(command) => {
                let out = run_checked(&*ctx.channel, command).await?;
                if out.is_empty() {
                    bail!("`{}` printed nothing", command);
                }
                Ok(out)
            }
            Self::Flag(name) => parse_flag(&ctx.read_value(name).await?),
            Self::Value(name) => ctx.read_value(name).await,
        }
    }
}

async fn fetch_service(ctx: &ProbeContext) -> Result<ServiceState> {
    let out = ctx
        .channel
        .run(&format!("pidof {}", SERVICE_PROCESS))
        .await?;
    let pid = out.stdout.trim();
    if !out.success() || pid.is_empty() || pid == "0" {
        return Ok(ServiceState::Suspended);
    }

    let (profile, ai) = tokio::join!(ctx.read_api("current_profile"), ctx.read_value("AIenabled"));
    Ok(service_state(
        pid.to_string(),
        profile.ok().as_deref(),
        ai.ok().as_deref(),
    ))
}

pub fn service_state(pid: String, profile: Option<&str>, ai: Option<&str>) -> ServiceState {
    match profile.map(str::trim) {
        Some("0") => ServiceState::Initializing { pid },
        Some("1" | "2" | "3") => match ai.map(str::trim) {
            Some("1") => ServiceState::RunningAuto { pid },
            Some("0") => ServiceState::RunningIdle { pid },
            _ => ServiceState::UnknownProfile { pid },
        },
        _ => ServiceState::UnknownProfile { pid },
    }
}

pub fn profile_label(raw: &str, lite: bool) -> String {
    let base = ProfileMode::from_api_value(raw)
        .map(|m| m.to_string())
        .unwrap_or_else(|| "Unknown".to_string());
    if lite {
        format!("{} (Lite)", base)
    } else {
        base
    }
}

pub fn parse_flag(raw: &str) -> Result<String> {
    match raw.trim() {
        "1" => Ok("Enabled".to_string()),
        "0" => Ok("Disabled".to_string()),
        other => bail!("unexpected switch value `{}`", other),
    }
}

pub fn normalize_soc(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn scaled(&self, percent: u32) -> Resolution {
        let scale = |v: u32| (v as f64 * percent as f64 / 100.0).round() as u32;
        Resolution {
            width: scale(self.width),
            height: scale(self.height),
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn resolution_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)x(\d+)").expect("valid resolution pattern"))
}

/// First `WxH` pair in `wm size` output.
pub fn parse_resolution(out: &str) -> Option<Resolution> {
    let caps = resolution_re().captures(out)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Resolution { width, height })
}

fn resolution_summary(res: Resolution) -> String {
    format!("{} (90%: {}, 80%: {})", res, res.scaled(90), res.scaled(80))
}
