use std::fs::File;

use assetkit::serialized::SerializedFile;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).expect("usage: dump <serialized file>");
    let mut file = File::open(path)?;

    let sf = SerializedFile::parse(&mut file)?;

    println!(
        "format v{}, engine {}, platform {:?}",
        sf.format_version().raw(),
        sf.unity_version.raw,
        sf.target_platform,
    );
    println!(
        "{} types, {} objects, {} externals",
        sf.types.len(),
        sf.objects.len(),
        sf.externals.len(),
    );

    for object in sf.objects.iter().take(20) {
        let type_name = sf
            .type_of(object)
            .and_then(|t| t.tree.as_ref())
            .and_then(|tree| tree.nodes.first())
            .map_or("?", |node| node.type_name.as_str());
        println!(
            "  path {:>6}  class {:>4} {:<20} {:>8} bytes at {:#x}",
            object.path_id, object.class_id, type_name, object.byte_size, object.byte_start,
        );
    }

    for external in &sf.externals {
        println!("  depends on {}", external.path);
    }

    Ok(())
}
