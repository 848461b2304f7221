use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{dictionary, Document, Object};

use pdf_flatten::config::Settings;
use pdf_flatten::dates::format_pdf_date;
use pdf_flatten::document::metadata::rewrite_dates;
use pdf_flatten::document::{Compactor, DocumentBuilder, GcLevel};
use pdf_flatten::error::{FlattenError, MetadataError};
use pdf_flatten::pipeline::Flattener;
use pdf_flatten::raster::{encode_jpeg, ImageEncoding, PageImage};

fn page_image(index: usize, width: u32, height: u32, color: [u8; 3]) -> PageImage {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let encoded = encode_jpeg(&img, 50).expect("Failed to encode test image");
    PageImage {
        index,
        width: encoded.width,
        height: encoded.height,
        data: encoded.data,
        encoding: ImageEncoding::Jpeg,
        color: encoded.color,
    }
}

/// The embedded image payload of page `page_id`, as stored in the file.
fn page_image_payload(doc: &Document, page_id: lopdf::ObjectId) -> Vec<u8> {
    let page = doc.get_dictionary(page_id).expect("page dictionary");
    let resources = page
        .get(b"Resources")
        .and_then(|r| r.as_dict())
        .expect("page resources");
    let xobjects = resources
        .get(b"XObject")
        .and_then(|x| x.as_dict())
        .expect("XObject dictionary");
    let (_, entry) = xobjects.iter().next().expect("one XObject per page");
    let xobject_id = entry.as_reference().expect("XObject reference");
    match doc.get_object(xobject_id).expect("XObject stream") {
        Object::Stream(stream) => stream.content.clone(),
        other => panic!("expected stream, got {:?}", other),
    }
}

fn info_string(info: &lopdf::Dictionary, key: &[u8]) -> Vec<u8> {
    match info.get(key).expect("info entry") {
        Object::String(bytes, _) => bytes.clone(),
        other => panic!("expected string for {:?}, got {:?}", key, other),
    }
}

fn save_to_bytes(doc: &mut Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to save document");
    bytes
}

#[test]
fn test_build_compact_roundtrip_preserves_pages_and_payloads() {
    let images = vec![
        page_image(0, 120, 80, [200, 30, 30]),
        page_image(1, 64, 64, [30, 200, 30]),
        page_image(2, 80, 120, [30, 30, 200]),
    ];

    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();
    let bytes = save_to_bytes(&mut doc);
    assert!(bytes.starts_with(b"%PDF"));

    let reloaded = Document::load_mem(&bytes).unwrap();
    let pages = reloaded.get_pages();
    assert_eq!(pages.len(), images.len());

    for (number, page_id) in pages {
        let image = &images[(number - 1) as usize];
        let page = reloaded.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), i64::from(image.width));
        assert_eq!(media_box[3].as_i64().unwrap(), i64::from(image.height));

        // Bit-identical payload: DCT streams must never be recompressed.
        assert_eq!(page_image_payload(&reloaded, page_id), image.data);
    }
}

#[test]
fn test_full_compaction_deduplicates_identical_pages() {
    let template = page_image(0, 50, 50, [128, 128, 128]);
    let mut second = template.clone();
    second.index = 1;
    let images = vec![template, second];

    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();
    let bytes = save_to_bytes(&mut doc);

    let reloaded = Document::load_mem(&bytes).unwrap();
    let pages = reloaded.get_pages();
    let ids: Vec<lopdf::ObjectId> = pages
        .values()
        .map(|&page_id| {
            let page = reloaded.get_dictionary(page_id).unwrap();
            let resources = page.get(b"Resources").and_then(|r| r.as_dict()).unwrap();
            let xobjects = resources.get(b"XObject").and_then(|x| x.as_dict()).unwrap();
            xobjects.iter().next().unwrap().1.as_reference().unwrap()
        })
        .collect();

    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1], "identical image streams should collapse");
}

#[test]
fn test_compaction_is_idempotent() {
    let images = vec![
        page_image(0, 60, 40, [10, 20, 30]),
        page_image(1, 40, 60, [40, 50, 60]),
    ];
    let built = DocumentBuilder::default().build(&images).unwrap();

    let compactor = Compactor::new(GcLevel::Full);
    let once = compactor.compact(built).unwrap();
    let object_count = once.objects.len();
    let page_count = once.get_pages().len();

    let twice = compactor.compact(once).unwrap();
    assert_eq!(twice.objects.len(), object_count);
    assert_eq!(twice.get_pages().len(), page_count);

    for (_, page_id) in twice.get_pages() {
        let payload = page_image_payload(&twice, page_id);
        assert!(images.iter().any(|img| img.data == payload));
    }
}

#[test]
fn test_metadata_rewrite_sets_dates_and_keeps_other_fields() {
    let images = vec![page_image(0, 32, 32, [1, 2, 3])];
    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();

    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal("Quarterly Report"),
        "Author" => Object::string_literal("Example Author"),
        "ModDate" => Object::string_literal("D:20190101000000+00'00'"),
    });
    doc.trailer.set("Info", info_id);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    doc.save(&path).unwrap();
    let size_before = std::fs::metadata(&path).unwrap().len();

    let creation = chrono::NaiveDate::from_ymd_opt(2021, 6, 15)
        .unwrap()
        .and_hms_opt(10, 20, 30)
        .unwrap();
    let modification = chrono::NaiveDate::from_ymd_opt(2021, 7, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap();
    rewrite_dates(&path, Some(creation), Some(modification)).unwrap();

    // Incremental: the original bytes are still a prefix of the file.
    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.len() > size_before as usize);
    assert!(bytes.windows(5).any(|w| w == b"/Prev"));

    let reloaded = Document::load(&path).unwrap();
    let info_ref = reloaded.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = reloaded.get_dictionary(info_ref).unwrap();

    assert_eq!(
        info_string(info, b"CreationDate"),
        format_pdf_date(creation).into_bytes()
    );
    assert_eq!(
        info_string(info, b"ModDate"),
        format_pdf_date(modification).into_bytes()
    );

    assert_eq!(info_string(info, b"Title"), b"Quarterly Report".to_vec());
    assert_eq!(info_string(info, b"Author"), b"Example Author".to_vec());
}

#[test]
fn test_metadata_partial_update_leaves_omitted_field_untouched() {
    let images = vec![page_image(0, 16, 16, [9, 9, 9])];
    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();

    let original_mod = "D:20190101000000+00'00'";
    let info_id = doc.add_object(dictionary! {
        "ModDate" => Object::string_literal(original_mod),
    });
    doc.trailer.set("Info", info_id);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    doc.save(&path).unwrap();

    let creation = chrono::NaiveDate::from_ymd_opt(2022, 3, 4)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    rewrite_dates(&path, Some(creation), None).unwrap();

    let reloaded = Document::load(&path).unwrap();
    let info_ref = reloaded.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = reloaded.get_dictionary(info_ref).unwrap();

    assert_eq!(
        info_string(info, b"CreationDate"),
        format_pdf_date(creation).into_bytes()
    );
    assert_eq!(info_string(info, b"ModDate"), original_mod.as_bytes().to_vec());
}

#[test]
fn test_metadata_rewrite_refuses_encrypted_document() {
    let images = vec![page_image(0, 16, 16, [5, 5, 5])];
    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locked.pdf");
    doc.save(&path).unwrap();
    let before = std::fs::read(&path).unwrap();

    let creation = chrono::NaiveDate::from_ymd_opt(2021, 6, 15)
        .unwrap()
        .and_hms_opt(10, 20, 30)
        .unwrap();
    let err = rewrite_dates(&path, Some(creation), Some(creation)).unwrap_err();
    assert!(matches!(err, MetadataError::Encrypted));

    // No partial revision: the file is byte-for-byte what it was.
    assert_eq!(std::fs::read(&path).unwrap(), before);
}

fn raster_scratch_dirs() -> Vec<std::path::PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("pdf-flatten-raster-"))
                .unwrap_or(false)
        })
        .collect()
}

#[test]
fn test_failed_run_leaves_no_temp_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.pdf");
    std::fs::write(&input, b"%PDF-1.5\nnot a real document\n%%EOF\n").unwrap();
    let out_dir = dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let scratch_before = raster_scratch_dirs();

    let err = Flattener::new(Settings::default())
        .flatten(&input, &out_dir.join("flat-broken.pdf"), None, None)
        .unwrap_err();
    assert!(matches!(err, FlattenError::Render(_)));

    // Neither a staged file nor an output landed next to the target.
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);

    // And no new rasterizer scratch directory survived in the temp dir.
    let scratch_after = raster_scratch_dirs();
    assert!(scratch_after.iter().all(|d| scratch_before.contains(d)));
}

#[test]
fn test_metadata_rewrite_without_info_creates_one() {
    let images = vec![page_image(0, 16, 16, [7, 7, 7])];
    let doc = DocumentBuilder::default().build(&images).unwrap();
    let mut doc = Compactor::new(GcLevel::Full).compact(doc).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    doc.save(&path).unwrap();

    let creation = chrono::NaiveDate::from_ymd_opt(2020, 5, 6)
        .unwrap()
        .and_hms_opt(1, 2, 3)
        .unwrap();
    rewrite_dates(&path, Some(creation), Some(creation)).unwrap();

    let reloaded = Document::load(&path).unwrap();
    let info_ref = reloaded.trailer.get(b"Info").unwrap().as_reference().unwrap();
    let info = reloaded.get_dictionary(info_ref).unwrap();
    assert_eq!(
        info_string(info, b"CreationDate"),
        format_pdf_date(creation).into_bytes()
    );
}
