//! The `learnmetric init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("learnmetric.toml").exists() {
        println!("learnmetric.toml already exists, skipping.");
    } else {
        std::fs::write("learnmetric.toml", SAMPLE_CONFIG)?;
        println!("Created learnmetric.toml");
    }

    let dir = Path::new("sample-workbook");
    std::fs::create_dir_all(dir)?;
    for (file, content) in [
        ("WB-Baseline-English.csv", SAMPLE_BASELINE),
        ("WB-Endline-English.csv", SAMPLE_ENDLINE),
        ("AnswerKey.csv", SAMPLE_ANSWER_KEY),
    ] {
        let path = dir.join(file);
        if path.exists() {
            println!("{} already exists, skipping.", path.display());
        } else {
            std::fs::write(&path, content)?;
            println!("Created {}", path.display());
        }
    }

    println!("\nNext steps:");
    println!("  1. Run: learnmetric validate --workbook sample-workbook");
    println!("  2. Run: learnmetric analyze --workbook sample-workbook --format all");
    println!("  3. Point --workbook at your own .xlsx export");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# learnmetric configuration

output_dir = "./learnmetric-results"
formats = ["json", "html"]

[sheets]
baseline = "WB-Baseline-English"
endline = "WB-Endline-English"
answer_key = "AnswerKey"
"#;

const SAMPLE_BASELINE: &str = r#"Student ID,State,Center,Grade,Q1,Q2,Q3
1001,Karnataka,Hubli,3,"{""value"":2}","{""value"":1}",
1002,Karnataka,Hubli,3,"{""value"":3}","{""value"":1}","{""value"":4}"
1003,Karnataka,Dharwad,4,"{""value"":1}",,"{""value"":2}"
1004,Tamil Nadu,Madurai,4,"{""value"":2}","{""value"":3}","{""value"":2}"
1005,Tamil Nadu,Madurai,3,,,
"#;

const SAMPLE_ENDLINE: &str = r#"Student ID,State,Center,Grade,Q1,Q2,Q3
1001,Karnataka,Hubli,3,"{""value"":2}","{""value"":1}","{""value"":3}"
1002,Karnataka,Hubli,3,"{""value"":2}","{""value"":1}","{""value"":4}"
1003,Karnataka,Dharwad,4,"{""value"":1}","{""value"":2}","{""value"":2}"
1004,Tamil Nadu,Madurai,4,"{""value"":1}","{""value"":3}","{""value"":2}"
1006,Tamil Nadu,Madurai,3,"{""value"":2}",,
"#;

const SAMPLE_ANSWER_KEY: &str = r#"Grade,Assessment,Question #,Correct Value
G3,Baseline,1,2
G3,Baseline,2,1
G3,Baseline,3,3
G3,Endline,1,2
G3,Endline,2,1
G3,Endline,3,3
G4,Baseline,1,1
G4,Baseline,2,2
G4,Baseline,3,2
G4,Endline,1,1
G4,Endline,2,2
G4,Endline,3,2
"#;
