//! Launcher descriptor resolution.
//!
//! Given the identifying strings of a window, hunt the freedesktop
//! application directories for a matching `.desktop` file. The strategies
//! run from cheap to desperate: exact filename scans, a punctuation-stripped
//! retry, a fuzzy filename scan guarded by command-line comparison, and a
//! table of known problem applications. Every lookup hits the filesystem;
//! nothing is cached between calls.

use freedesktop_desktop_entry::DesktopEntry;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions stripped from candidate names before the exact scan
const SCRIPT_EXTENSIONS: [&str; 3] = [".py", ".pl", ".exe"];

/// Characters treated as noise during the token-stripped retry
const DELIMITERS: &str = "-.:,=+_~!@#$%^()[]{}'";

/// A discovered application launcher: the descriptor file plus its declared
/// execution command. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherDescriptor {
    pub path: PathBuf,
    pub exec: String,
    pub name: Option<String>,
    pub icon: Option<String>,
}

impl LauncherDescriptor {
    /// Parse a descriptor file. Returns None for unreadable or Exec-less
    /// files; resolution treats those as a miss.
    pub fn from_desktop_file(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        let entry = DesktopEntry::decode(path, &content).ok()?;
        let exec = entry.exec()?.to_string();
        Some(LauncherDescriptor {
            name: entry.name(None).map(|n| n.to_string()),
            icon: entry.icon().map(str::to_string),
            exec,
            path: path.to_path_buf(),
        })
    }

    /// Descriptor filename without the .desktop suffix
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|s| s.to_str())
    }
}

/// The ordered identifying strings of a window, assembled at admission time.
#[derive(Debug, Clone, Default)]
pub struct WindowIdentity {
    pub res_name: Option<String>,
    pub class_name: Option<String>,
    pub title: String,
    /// argv[0] of the owning process
    pub cmd: Option<String>,
    /// full reconstructed command line
    pub full_cmd: Option<String>,
}

impl WindowIdentity {
    pub fn cmd_basename(&self) -> Option<String> {
        let cmd = self.cmd.as_deref()?;
        Path::new(cmd)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

struct SpecialCase {
    cmd: Option<&'static str>,
    res_name: Option<&'static str>,
    class_name: Option<&'static str>,
    title: Option<&'static str>,
    desktop: &'static str,
}

lazy_static! {
    /// Known problem applications whose windows carry identifying strings
    /// that never line up with their descriptor filename. Checked in order;
    /// substring match on cmd and title, exact (caseless) on the rest.
    static ref SPECIAL_CASES: Vec<SpecialCase> = vec![
        SpecialCase {
            cmd: Some("soffice"),
            res_name: None,
            class_name: None,
            title: Some("Writer"),
            desktop: "libreoffice-writer",
        },
        SpecialCase {
            cmd: Some("soffice"),
            res_name: None,
            class_name: None,
            title: Some("Calc"),
            desktop: "libreoffice-calc",
        },
        SpecialCase {
            cmd: Some("soffice"),
            res_name: None,
            class_name: None,
            title: Some("Impress"),
            desktop: "libreoffice-impress",
        },
        SpecialCase {
            cmd: Some("soffice"),
            res_name: None,
            class_name: None,
            title: None,
            desktop: "libreoffice-startcenter",
        },
        // XUL applications report the Navigator resource name
        SpecialCase {
            cmd: Some("firefox"),
            res_name: Some("Navigator"),
            class_name: None,
            title: None,
            desktop: "firefox",
        },
        SpecialCase {
            cmd: Some("thunderbird-bin"),
            res_name: None,
            class_name: None,
            title: None,
            desktop: "thunderbird",
        },
    ];
}

/// Resolver over a fixed set of application directories.
pub struct LauncherResolver {
    system_app_dirs: Vec<PathBuf>,
    user_app_dir: Option<PathBuf>,
}

impl LauncherResolver {
    /// Resolver over the standard XDG application directories
    pub fn new() -> Self {
        LauncherResolver {
            system_app_dirs: system_application_dirs(),
            user_app_dir: dirs::data_local_dir().map(|d| d.join("applications")),
        }
    }

    /// Resolver over explicit directories (for testing)
    pub fn with_dirs(system_app_dirs: Vec<PathBuf>, user_app_dir: Option<PathBuf>) -> Self {
        LauncherResolver {
            system_app_dirs,
            user_app_dir,
        }
    }

    /// Run the full strategy chain; first success wins.
    pub fn resolve(&self, ident: &WindowIdentity) -> Option<LauncherDescriptor> {
        if let Some(res_name) = nonempty(ident.res_name.as_deref())
            && let Some(found) = self.find_exact(res_name)
        {
            return Some(found);
        }
        if let Some(class_name) = nonempty(ident.class_name.as_deref())
            && let Some(found) = self.find_exact(class_name)
        {
            return Some(found);
        }
        if let Some(full_cmd) = nonempty(ident.full_cmd.as_deref())
            && let Some(found) = self.find_exact(full_cmd)
        {
            return Some(found);
        }
        if let Some(cmd) = nonempty(ident.cmd.as_deref())
            && let Some(found) = self.find_exact(cmd)
        {
            return Some(found);
        }

        if let Some(class_name) = nonempty(ident.class_name.as_deref()) {
            if let Some(full_cmd) = nonempty(ident.full_cmd.as_deref())
                && let Some(found) = self.find_fuzzy(class_name, full_cmd)
            {
                return Some(found);
            }
            if let Some(cmd) = nonempty(ident.cmd.as_deref())
                && let Some(found) = self.find_fuzzy(class_name, cmd)
            {
                return Some(found);
            }
        }

        if let Some(basename) = ident.cmd_basename()
            && !basename.is_empty()
            && let Some(found) = self.find_exact(&basename)
        {
            return Some(found);
        }

        if let Some(full_cmd) = nonempty(ident.full_cmd.as_deref())
            && let Some(found) = self.find_special_case(full_cmd, ident)
        {
            return Some(found);
        }
        if let Some(cmd) = nonempty(ident.cmd.as_deref())
            && let Some(found) = self.find_special_case(cmd, ident)
        {
            return Some(found);
        }

        debug!("No descriptor for {:?}", ident.res_name);
        None
    }

    /// Exact scan: `<lowercased name>.desktop` in every system application
    /// directory (recursing into subdirectories), then the user directory.
    /// On a miss, delimiters are stripped and the scan retried once.
    pub fn find_exact(&self, name: &str) -> Option<LauncherDescriptor> {
        self.find_exact_inner(name, true)
    }

    fn find_exact_inner(&self, name: &str, allow_retry: bool) -> Option<LauncherDescriptor> {
        let stripped = strip_script_extension(name);
        let lower = stripped.to_lowercase();

        for dir in &self.system_app_dirs {
            if let Some(found) = scan_dir_recursive(dir, &lower) {
                return Some(found);
            }
        }
        if let Some(user_dir) = &self.user_app_dir {
            let candidate = user_dir.join(format!("{}.desktop", lower));
            if let Some(found) = LauncherDescriptor::from_desktop_file(&candidate) {
                debug!("Found descriptor {:?} in user directory", candidate);
                return Some(found);
            }
        }

        if allow_retry {
            let normalized = strip_delimiters(&lower);
            if normalized != lower {
                return self.find_exact_inner(&normalized, false);
            }
        }
        None
    }

    /// Fuzzy scan: match descriptor filenames against the class name, then
    /// guard each hit by requiring the declared Exec and the observed
    /// command to contain one another (either direction).
    pub fn find_fuzzy(&self, class_name: &str, cmd: &str) -> Option<LauncherDescriptor> {
        if class_name.is_empty() || cmd.is_empty() {
            return None;
        }
        let re = filename_pattern(class_name)?;

        for dir in &self.system_app_dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(file_name) = file_name.to_str() else {
                    continue;
                };
                if !re.is_match(file_name) {
                    continue;
                }
                let path = entry.path();
                let Some(found) = LauncherDescriptor::from_desktop_file(&path) else {
                    continue;
                };
                if commands_overlap(&found.exec, cmd) {
                    debug!("Fuzzy match {:?} for class {}", path, class_name);
                    return Some(found);
                }
            }
        }
        None
    }

    fn find_special_case(
        &self,
        cmd: &str,
        ident: &WindowIdentity,
    ) -> Option<LauncherDescriptor> {
        let desktop = special_desktop_name(
            cmd,
            ident.res_name.as_deref(),
            ident.class_name.as_deref(),
            &ident.title,
        )?;
        if let Some(found) = self.find_exact(desktop) {
            return Some(found);
        }
        if cmd.len() > 8 {
            return self.find_fuzzy(desktop, cmd);
        }
        None
    }
}

impl Default for LauncherResolver {
    fn default() -> Self {
        LauncherResolver::new()
    }
}

/// True when one command string contains the other, ignoring case
pub fn commands_overlap(exec: &str, cmd: &str) -> bool {
    let exec = exec.to_lowercase();
    let cmd = cmd.to_lowercase();
    !exec.is_empty() && !cmd.is_empty() && (exec.contains(&cmd) || cmd.contains(&exec))
}

fn filename_pattern(class_name: &str) -> Option<Regex> {
    let pattern = format!(".*{}.*desktop", regex::escape(&class_name.to_lowercase()));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

fn special_desktop_name(
    cmd: &str,
    res_name: Option<&str>,
    class_name: Option<&str>,
    title: &str,
) -> Option<&'static str> {
    let cmd_lower = cmd.to_lowercase();
    let title_lower = title.to_lowercase();
    for case in SPECIAL_CASES.iter() {
        if let Some(want) = case.cmd
            && !cmd_lower.contains(&want.to_lowercase())
        {
            continue;
        }
        if let Some(want) = case.res_name
            && !res_name.is_some_and(|r| r.eq_ignore_ascii_case(want))
        {
            continue;
        }
        if let Some(want) = case.class_name
            && !class_name.is_some_and(|c| c.eq_ignore_ascii_case(want))
        {
            continue;
        }
        if let Some(want) = case.title
            && !title_lower.contains(&want.to_lowercase())
        {
            continue;
        }
        return Some(case.desktop);
    }
    None
}

/// Look for `<stem>.desktop` directly in `dir`, then in its subdirectories.
fn scan_dir_recursive(dir: &Path, stem: &str) -> Option<LauncherDescriptor> {
    let candidate = dir.join(format!("{}.desktop", stem));
    if let Some(found) = LauncherDescriptor::from_desktop_file(&candidate) {
        debug!("Found descriptor {:?}", candidate);
        return Some(found);
    }

    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir()
            && let Some(found) = scan_dir_recursive(&path, stem)
        {
            return Some(found);
        }
    }
    None
}

fn strip_script_extension(name: &str) -> &str {
    for ext in SCRIPT_EXTENSIONS {
        if let Some(pos) = name.rfind(ext) {
            return &name[..pos];
        }
    }
    name
}

fn strip_delimiters(name: &str) -> String {
    name.chars().filter(|c| !DELIMITERS.contains(*c)).collect()
}

fn nonempty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

fn system_application_dirs() -> Vec<PathBuf> {
    let data_dirs =
        env::var("XDG_DATA_DIRS").unwrap_or_else(|_| "/usr/local/share:/usr/share".to_string());
    data_dirs
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join("applications"))
        .collect()
}
