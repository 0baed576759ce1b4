#![no_main]

use bbf_rs::BookReader;
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    // Skip inputs that cannot hold a header and footer
    if data.len() < bbf_rs::HEADER_SIZE + bbf_rs::FOOTER_SIZE {
        return;
    }

    let mut temp_file = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };

    if temp_file.write_all(data).is_err() || temp_file.flush().is_err() {
        return;
    }

    let path = temp_file.path();

    // Opening must reject garbage without panicking
    let mut reader = match BookReader::open(path) {
        Ok(r) => r,
        Err(_) => return,
    };

    // Section resolution over arbitrary parents and start pages
    if let Ok(tree) = reader.section_tree() {
        for index in 0..tree.len() {
            let range = tree.range(index);
            assert!(range.start <= range.end);
            assert!(range.end <= tree.page_count());
            let _ = tree.depth(index);
        }
        let _ = tree.find("");
    }

    let _ = reader.metadata_pairs();
    let _ = reader.string(0);
    let _ = reader.string(u32::MAX);

    // Asset reads must bounds-check crafted offsets
    if let Ok(assets) = reader.assets() {
        for asset in assets.iter().take(16) {
            let _ = reader.read_asset(asset);
        }
    }

    let _ = bbf_rs::verify::verify_assets(&mut reader);
    let _ = bbf_rs::info(path);
});
