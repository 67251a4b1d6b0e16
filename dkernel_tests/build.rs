use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

/// Generates one test for each test case file.
pub fn main() {
    println!("cargo:rerun-if-changed=tests");
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let destination = std::path::Path::new(&out_dir).join("tests.rs");
    let f = std::fs::File::create(destination).unwrap();

    let f = &mut BufWriter::new(f);
    scan_dir(f, &PathBuf::from("tests/src"), &PathBuf::new());
}

fn scan_dir(f: &mut impl Write, root: &Path, suffix: &Path) {
    let mut entries = std::fs::read_dir(root.join(suffix))
        .unwrap()
        .map(|entry| entry.unwrap())
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.file_name());
    for entry in entries {
        let ty = entry.file_type().unwrap();
        if ty.is_dir() {
            scan_dir(f, root, &suffix.join(entry.file_name()));
        } else if ty.is_file() && entry.file_name().to_string_lossy().ends_with(".ron") {
            let path = suffix
                .join(entry.file_name())
                .to_string_lossy()
                .replace('\\', "/");
            let name = path.replace(['/', '-'], "_").replace(".ron", "");
            write!(
                f,
                r#"
                #[test]
                fn {name}() {{
                    run_test("{path}");
                }}
                "#
            )
            .unwrap();
        }
    }
}
