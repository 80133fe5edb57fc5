use std::collections::HashSet;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Result};

pub const ENGINE_READY_TIMEOUT: Duration = Duration::from_secs(30);
pub const ENGINE_QUIT_TIMEOUT: Duration = Duration::from_millis(300);
pub const ENGINE_QUIT_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Upper bound on one search when only `depth` limits it.
pub const DEPTH_SEARCH_TIMEOUT: Duration = Duration::from_secs(600);

/// Engine process launch settings.
pub struct EngineConfig {
    pub path: PathBuf,
    pub args: Vec<String>,
    /// `UCI_Variant` value, set when the engine advertises the option.
    pub variant: Option<String>,
    /// Extra UCI options (Name=Value form).
    pub uci_options: Vec<String>,
}

/// Search limits passed to `go`; at least one must be set.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchLimits {
    pub depth: Option<u32>,
    pub movetime: Option<u64>,
}

impl SearchLimits {
    pub fn is_empty(&self) -> bool {
        self.depth.is_none() && self.movetime.is_none()
    }

    fn go_command(&self) -> String {
        let mut cmd = String::from("go");
        if let Some(depth) = self.depth {
            cmd.push_str(&format!(" depth {depth}"));
        }
        if let Some(movetime) = self.movetime {
            cmd.push_str(&format!(" movetime {movetime}"));
        }
        cmd
    }

    /// Soft deadline for a search under these limits.
    fn soft_limit(&self, margin_ms: u64) -> Duration {
        match self.movetime {
            Some(ms) => Duration::from_millis(ms.saturating_add(margin_ms)),
            None => DEPTH_SEARCH_TIMEOUT,
        }
    }
}

/// Score reported on the engine's last primary `info` line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineScore {
    pub cp: Option<i32>,
    pub mate: Option<i32>,
    pub depth: Option<u32>,
}

impl EngineScore {
    /// Fold one `info` line into the snapshot; multipv > 1 lines are skipped.
    pub fn update_from_line(&mut self, line: &str) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first().copied() != Some("info") {
            return;
        }
        let mut i = 1;
        while i < tokens.len() {
            match tokens[i] {
                "multipv" => {
                    if i + 1 < tokens.len() && tokens[i + 1] != "1" {
                        return;
                    }
                    i += 1;
                }
                "depth" => {
                    if i + 1 < tokens.len() {
                        self.depth = tokens[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "score" => {
                    if i + 2 < tokens.len() {
                        match tokens[i + 1] {
                            "cp" => {
                                self.cp = tokens[i + 2].parse().ok();
                                self.mate = None;
                                i += 2;
                            }
                            "mate" => {
                                self.mate = tokens[i + 2].parse().ok();
                                self.cp = None;
                                i += 2;
                            }
                            _ => {}
                        }
                    }
                }
                // Everything after "pv" is the line itself.
                "pv" => break,
                _ => {}
            }
            i += 1;
        }
    }

    fn into_option(self) -> Option<EngineScore> {
        if self == EngineScore::default() {
            None
        } else {
            Some(self)
        }
    }
}

pub struct SearchOutcome {
    pub bestmove: Option<String>,
    pub elapsed_ms: u64,
    pub timed_out: bool,
    pub score: Option<EngineScore>,
}

/// Input/output for a single engine process.
pub struct EngineProcess {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    opt_names: HashSet<String>,
    pub label: String,
}

impl EngineProcess {
    pub fn spawn(cfg: &EngineConfig, label: String) -> Result<Self> {
        let mut cmd = Command::new(&cfg.path);
        if !cfg.args.is_empty() {
            cmd.args(&cfg.args);
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow!("failed to spawn engine at {}: {e}", cfg.path.display()))?;
        let stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("no stdout"))?;
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let reader = BufReader::new(stdout);
            for line in reader.lines() {
                match line {
                    Ok(l) => {
                        if tx.send(l).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        let mut proc = Self {
            child,
            stdin: BufWriter::new(stdin),
            rx,
            opt_names: HashSet::new(),
            label,
        };
        proc.initialize(cfg)?;
        Ok(proc)
    }

    fn initialize(&mut self, cfg: &EngineConfig) -> Result<()> {
        self.write_line("uci")?;
        loop {
            let line = self.recv_line(ENGINE_READY_TIMEOUT)?;
            if let Some(rest) = line.strip_prefix("option ") {
                if let Some(name) = parse_option_name(rest) {
                    self.opt_names.insert(name);
                }
            } else if line == "uciok" {
                break;
            }
        }
        if let Some(variant) = &cfg.variant {
            self.set_option_if_available("UCI_Variant", variant)?;
        }
        for opt in &cfg.uci_options {
            if let Some((name, value)) = opt.split_once('=') {
                self.write_line(&format!(
                    "setoption name {} value {}",
                    name.trim(),
                    value.trim()
                ))?;
            } else {
                // No "=" means a button/flag option without a value.
                self.write_line(&format!("setoption name {}", opt.trim()))?;
            }
        }
        self.sync_ready()?;
        self.write_line("ucinewgame")?;
        Ok(())
    }

    pub fn new_game(&mut self) -> Result<()> {
        self.write_line("ucinewgame")?;
        self.sync_ready()
    }

    /// Ask for a best move from `fen` after `moves`.
    pub fn search(
        &mut self,
        fen: &str,
        moves: &[String],
        limits: &SearchLimits,
        timeout_margin_ms: u64,
    ) -> Result<SearchOutcome> {
        let mut position_cmd = format!("position fen {fen}");
        if !moves.is_empty() {
            position_cmd.push_str(" moves ");
            position_cmd.push_str(&moves.join(" "));
        }
        self.write_line(&position_cmd)?;
        self.write_line(&limits.go_command())?;

        let start = Instant::now();
        let soft_limit = limits.soft_limit(timeout_margin_ms);
        let hard_limit = soft_limit + Duration::from_millis(timeout_margin_ms.max(100));
        let mut stop_sent = false;
        let mut snapshot = EngineScore::default();

        loop {
            let elapsed = start.elapsed();
            let deadline = if stop_sent { hard_limit } else { soft_limit };
            if elapsed >= deadline {
                if !stop_sent {
                    self.write_line("stop")?;
                    stop_sent = true;
                    continue;
                }
                return Ok(SearchOutcome {
                    bestmove: None,
                    elapsed_ms: duration_to_millis(elapsed),
                    timed_out: true,
                    score: snapshot.into_option(),
                });
            }

            let remaining = deadline.saturating_sub(elapsed);
            match self.rx.recv_timeout(remaining) {
                Ok(line) => {
                    if line.starts_with("info") {
                        snapshot.update_from_line(&line);
                        continue;
                    }
                    if let Some(rest) = line.strip_prefix("bestmove ") {
                        let mv = rest.split_whitespace().next().unwrap_or_default();
                        let bestmove = match mv {
                            "" | "(none)" | "none" => None,
                            other => Some(other.to_string()),
                        };
                        return Ok(SearchOutcome {
                            bestmove,
                            elapsed_ms: duration_to_millis(start.elapsed()),
                            timed_out: stop_sent,
                            score: snapshot.into_option(),
                        });
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if !stop_sent {
                        self.write_line("stop")?;
                        stop_sent = true;
                    } else {
                        return Ok(SearchOutcome {
                            bestmove: None,
                            elapsed_ms: duration_to_millis(start.elapsed()),
                            timed_out: true,
                            score: snapshot.into_option(),
                        });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    bail!("{}: engine exited unexpectedly", self.label);
                }
            }
        }
    }

    pub fn sync_ready(&mut self) -> Result<()> {
        self.write_line("isready")?;
        loop {
            let line = self.recv_line(ENGINE_READY_TIMEOUT)?;
            if line == "readyok" {
                break;
            }
        }
        Ok(())
    }

    pub fn recv_line(&self, timeout: Duration) -> Result<String> {
        self.rx
            .recv_timeout(timeout)
            .map_err(|_| anyhow!("{}: engine read timeout", self.label))
    }

    pub fn set_option_if_available(&mut self, name: &str, value: &str) -> Result<()> {
        if self.opt_names.is_empty() || self.opt_names.contains(name) {
            self.write_line(&format!("setoption name {name} value {value}"))?;
        }
        Ok(())
    }

    pub fn write_line(&mut self, msg: &str) -> Result<()> {
        self.stdin.write_all(msg.as_bytes())?;
        self.stdin.write_all(b"\n")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.write_line("quit");
        let deadline = Instant::now() + ENGINE_QUIT_TIMEOUT;
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                return;
            }
            std::thread::sleep(ENGINE_QUIT_POLL_INTERVAL);
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn parse_option_name(line: &str) -> Option<String> {
    let mut tokens = line.split_whitespace().peekable();
    while let Some(tok) = tokens.next() {
        if tok == "name" {
            let mut parts = Vec::new();
            while let Some(next) = tokens.peek() {
                if *next == "type" {
                    break;
                }
                parts.push(tokens.next().unwrap().to_string());
            }
            if !parts.is_empty() {
                return Some(parts.join(" "));
            }
        }
    }
    None
}

pub fn duration_to_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_option_name() {
        assert_eq!(
            parse_option_name("name UCI_Variant type combo default chess"),
            Some("UCI_Variant".to_string())
        );
        assert_eq!(
            parse_option_name("name Skill Level type spin default 20 min 0 max 20"),
            Some("Skill Level".to_string())
        );
        assert_eq!(parse_option_name("type spin default 1"), None);
    }

    #[test]
    fn test_go_command() {
        let both = SearchLimits {
            depth: Some(8),
            movetime: Some(100),
        };
        assert_eq!(both.go_command(), "go depth 8 movetime 100");
        let depth_only = SearchLimits {
            depth: Some(12),
            movetime: None,
        };
        assert_eq!(depth_only.go_command(), "go depth 12");
        assert!(SearchLimits::default().is_empty());
    }

    #[test]
    fn test_info_score_parsing() {
        let mut snap = EngineScore::default();
        snap.update_from_line("info depth 10 seldepth 14 nodes 4242 score cp 35 pv e2e4 e7e5");
        assert_eq!(snap.cp, Some(35));
        assert_eq!(snap.depth, Some(10));

        snap.update_from_line("info depth 12 score mate 3 pv d1h5");
        assert_eq!(snap.cp, None);
        assert_eq!(snap.mate, Some(3));

        // Secondary lines are ignored.
        snap.update_from_line("info multipv 2 depth 12 score cp -300 pv a2a3");
        assert_eq!(snap.mate, Some(3));
        assert_eq!(snap.depth, Some(12));
    }

    #[test]
    fn test_empty_score_is_none() {
        assert!(EngineScore::default().into_option().is_none());
        let mut snap = EngineScore::default();
        snap.update_from_line("info score cp 0 depth 1");
        assert!(snap.into_option().is_some());
    }
}
