use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use finale_script::{
    command::CommandId, find_command, operand::prepare_command_operands, tokenizer::Tokenizer,
    Directive,
};
use walkdir::WalkDir;

use crate::cli::LintArgs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    /// Byte offset just past the offending token.
    pub offset: usize,
    pub message: String,
}

pub fn execute(args: LintArgs) -> Result<()> {
    let scripts = collect_scripts(&args.dir, &args.extension)?;
    let mut total = 0;
    for path in &scripts {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading finale script {}", path.display()))?;
        let issues = lint_script(&text);
        for issue in &issues {
            println!("{}@{}: {}", path.display(), issue.offset, issue.message);
        }
        total += issues.len();
    }

    println!(
        "Checked {} script(s) under {}: {total} issue(s)",
        scripts.len(),
        args.dir.display()
    );
    if total > 0 {
        bail!("{total} issue(s) found in finale scripts");
    }
    Ok(())
}

fn collect_scripts(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut scripts = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            scripts.push(entry.into_path());
        }
    }
    scripts.sort();
    Ok(scripts)
}

/// Reads a script the way the interpreter would without running anything,
/// reporting malformed commands and jumps to markers that do not exist.
pub fn lint_script(text: &str) -> Vec<LintIssue> {
    let mut tokenizer = Tokenizer::new(text);
    let mut issues = Vec::new();
    let mut markers = BTreeSet::new();
    let mut jumps = Vec::new();
    let mut directive = Directive::Normal;
    let mut first = true;

    loop {
        let token = match tokenizer.next_token() {
            Ok(Some(token)) => token.to_string(),
            Ok(None) => break,
            Err(err) => {
                issues.push(LintIssue {
                    offset: tokenizer.cursor(),
                    message: err.to_string(),
                });
                return issues;
            }
        };
        let offset = tokenizer.cursor();

        if first && token.eq_ignore_ascii_case("OnLoad") {
            first = false;
            match tokenizer.next_token() {
                Ok(Some("{")) => directive = Directive::OnLoad,
                _ => issues.push(LintIssue {
                    offset,
                    message: "expected \"{\" after OnLoad".to_string(),
                }),
            }
            continue;
        }
        first = false;
        if token == "}" && directive == Directive::OnLoad {
            directive = Directive::Normal;
            continue;
        }
        if token == ";" {
            continue;
        }

        let Some(descriptor) = find_command(&token) else {
            issues.push(LintIssue {
                offset,
                message: format!("unknown command {token:?}"),
            });
            continue;
        };
        if descriptor.exclude.contains(directive) {
            issues.push(LintIssue {
                offset,
                message: format!("{} is not allowed in the {directive} directive", descriptor.name),
            });
        }
        let operands = match prepare_command_operands(descriptor, &mut tokenizer) {
            Ok(operands) => operands,
            Err(err) => {
                issues.push(LintIssue {
                    offset,
                    message: err.to_string(),
                });
                continue;
            }
        };
        match descriptor.id {
            CommandId::Marker => {
                markers.insert(operands[0].as_str().to_ascii_lowercase());
            }
            CommandId::GoTo => jumps.push((offset, operands[0].as_str().to_string())),
            CommandId::OnKey => jumps.push((offset, operands[1].as_str().to_string())),
            _ => {}
        }
    }

    if directive == Directive::OnLoad {
        issues.push(LintIssue {
            offset: text.len(),
            message: "OnLoad directive block is not terminated".to_string(),
        });
    }
    for (offset, target) in jumps {
        if !target.is_empty() && !markers.contains(&target.to_ascii_lowercase()) {
            issues.push(LintIssue {
                offset,
                message: format!("no MARKER named {target:?}"),
            });
        }
    }
    issues
}
