use crate::support::{fail, print_json_or_exit};
use lorchestra_callable::global;

pub fn run(json_output: bool) {
    let rows = global()
        .with_registry_ref(|registry| registry.rows())
        .unwrap_or_else(|e| fail(e));

    if json_output {
        print_json_or_exit("callables", &rows);
        return;
    }

    println!("lorchestra callables");
    for row in &rows {
        let state = if row.installed { "installed" } else { "not installed" };
        match &row.target {
            Some(target) => println!(
                "  {} -> {} ({}, {state})",
                row.name,
                target,
                row.provenance.as_str()
            ),
            None => println!("  {} ({}, {state})", row.name, row.provenance.as_str()),
        }
    }
    println!("  Total: {}", rows.len());
}
