use promisetrack::config::{now_ts, Config};
use promisetrack::dataset::{analyze_dataset, default_manifest_path};
use promisetrack::logging::{log, obj, v_str, Domain, Level};
use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let cfg = Config::from_env();
    let path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.dataset_path("population.json"));

    let (manifest, report) = match analyze_dataset(&path, cfg.stale_after_months, now_ts()) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("analysis failed: {}", err);
            std::process::exit(3);
        }
    };

    log(
        if report.bad_rows > 0 || report.stale { Level::Warn } else { Level::Info },
        Domain::Dataset,
        "analyzed",
        obj(&[
            ("path", v_str(&manifest.path)),
            ("hash", v_str(&manifest.hash_sha256)),
            ("rows", json!(report.rows)),
            ("bad_rows", json!(report.bad_rows)),
            ("gaps", json!(report.gaps)),
            ("stale", json!(report.stale)),
        ]),
    );

    let out_path = default_manifest_path(&path);
    let payload = json!({
        "manifest": manifest,
        "report": report
    });
    let text = match serde_json::to_string_pretty(&payload) {
        Ok(t) => t,
        Err(err) => {
            eprintln!("failed to encode manifest: {}", err);
            std::process::exit(4);
        }
    };
    if let Err(err) = fs::write(&out_path, text) {
        eprintln!("failed to write {}: {}", out_path.display(), err);
        std::process::exit(4);
    }
    println!("wrote manifest {}", out_path.display());
}
