//! Builds and queries module indexes.
//!
//! Usage:
//!   modindex write <module-dir> <index-file>
//!   modindex cook <index-file> <module-dir> <rel-dir>
//!   modindex scan <dir>
//!
//! The build context comes from `GOOS`, `GOARCH`, `CGO_ENABLED` and
//! `MODINDEX_TAGS`, or from the JSON file named by `MODINDEX_CONTEXT`.

use std::path::Path;
use std::process::ExitCode;

use modindex::{
    cook, index_module, scan_dir, write_module_index, BuildContext, CookedPackage,
    GoHeaderScanner, ImportMode, IndexError, ModuleIndex, Result,
};

const USAGE: &str = "usage:
  modindex write <module-dir> <index-file>
  modindex cook <index-file> <module-dir> <rel-dir>
  modindex scan <dir>";

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let result = match args.as_slice() {
        ["write", module_dir, index_file] => write(Path::new(module_dir), Path::new(index_file)),
        ["cook", index_file, module_dir, rel_dir] => {
            cook_indexed(Path::new(index_file), Path::new(module_dir), rel_dir)
        }
        ["scan", dir] => cook_scanned(Path::new(dir)),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("modindex: {error}");
            ExitCode::FAILURE
        }
    }
}

fn context() -> Result<BuildContext> {
    match std::env::var_os("MODINDEX_CONTEXT") {
        Some(path) if !path.is_empty() => BuildContext::load(Path::new(&path)),
        _ => BuildContext::from_env(),
    }
}

fn write(module_dir: &Path, index_file: &Path) -> Result<()> {
    let module = index_module(module_dir, &GoHeaderScanner)?;
    let count = module.len();
    write_module_index(index_file, module, module_dir)?;
    println!("indexed {count} directories into {}", index_file.display());
    Ok(())
}

fn cook_indexed(index_file: &Path, module_dir: &Path, rel_dir: &str) -> Result<()> {
    let ctx = context()?;
    let index = ModuleIndex::open(index_file, module_dir)?;
    let package = index.import_package(&ctx, rel_dir.trim_matches('/'), ImportMode::IMPORT_COMMENT);
    index.close();
    print_package(&package?)
}

fn cook_scanned(dir: &Path) -> Result<()> {
    let ctx = context()?;
    let dir = std::path::absolute(dir)?;
    let package = scan_dir(&dir, &GoHeaderScanner);
    print_package(&cook(&package, &ctx, ImportMode::IMPORT_COMMENT)?)
}

fn print_package(package: &CookedPackage) -> Result<()> {
    let json = serde_json::to_string_pretty(package)
        .map_err(|error| IndexError::Serialization(error.to_string()))?;
    println!("{json}");
    Ok(())
}
