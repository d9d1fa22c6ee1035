//! Man pages for callwatch.
//!
//! Writes `callwatch.1` plus one page per visible subcommand
//! (`callwatch-list.1`, `callwatch-watch.1`, `callwatch-config-show.1`, ...)
//! to `$OUT_DIR/man`, for packagers to pick up.

use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;

// Only clap derives live in cli.rs, so it builds with the build-dependencies.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let man_dir = PathBuf::from(std::env::var_os("OUT_DIR").expect("OUT_DIR not set by Cargo"))
        .join("man");
    fs::create_dir_all(&man_dir).expect("failed to create man output directory");

    let mut root = cli::Cli::command();
    root.build();
    write_pages(&root, "callwatch", &man_dir);
}

fn write_pages(cmd: &clap::Command, page: &str, dir: &Path) {
    let path = dir.join(format!("{page}.1"));
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone().name(page.to_owned()))
        .render(&mut buf)
        .unwrap_or_else(|e| panic!("cannot render {page}.1: {e}"));
    fs::write(&path, buf).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));

    // No page for the generated `help` subcommand.
    for sub in cmd
        .get_subcommands()
        .filter(|s| !s.is_hide_set() && s.get_name() != "help")
    {
        write_pages(sub, &format!("{page}-{}", sub.get_name()), dir);
    }
}
