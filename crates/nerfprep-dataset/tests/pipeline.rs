use std::path::Path;

use approx::assert_relative_eq;
use image::{GenericImageView, Rgb, RgbImage};
use nerfprep_dataset::{
    descriptor::read_transforms,
    pipeline::{
        process_images, process_polycam, process_record3d, ImagesParams, PolycamParams,
        Record3dParams,
    },
    report::{Level, MemoryReporter},
    sampler::sample_indices,
    summary::{matching_summary, MatchQuality},
    DatasetError,
};
use nerfprep_io::error::IoError;

fn write_test_image(path: &Path, width: u32, height: u32) -> Result<(), Box<dyn std::error::Error>> {
    let image = RgbImage::from_fn(width, height, |x, y| Rgb([(x * 7) as u8, (y * 5) as u8, 128]));
    image.save(path)?;
    Ok(())
}

fn write_record3d(data: &Path, num_frames: usize) -> Result<(), Box<dyn std::error::Error>> {
    let rgb_dir = data.join("rgb");
    std::fs::create_dir_all(&rgb_dir)?;
    for i in 0..num_frames {
        write_test_image(&rgb_dir.join(format!("{i}.jpg")), 32, 24)?;
    }
    // duplicates exported by the app are ignored
    write_test_image(&rgb_dir.join("3(1).jpg"), 32, 24)?;

    let poses = (0..num_frames)
        .map(|i| vec![0.0, 0.0, 0.0, 1.0, i as f64, 0.5, 0.25])
        .collect::<Vec<_>>();
    let metadata = serde_json::json!({
        "poses": poses,
        "K": [100.0, 0.0, 0.0, 0.0, 100.0, 0.0, 10.0, 10.0, 1.0],
        "w": 32,
        "h": 24,
    });
    std::fs::write(data.join("metadata.json"), serde_json::to_vec(&metadata)?)?;
    Ok(())
}

fn polycam_camera(blur_score: Option<f64>, tx: f64) -> serde_json::Value {
    let mut camera = serde_json::json!({
        "fx": 50.0, "fy": 51.0, "cx": 32.0, "cy": 24.0, "width": 64, "height": 48,
        "t_00": 1.0, "t_01": 0.0, "t_02": 0.0, "t_03": tx,
        "t_10": 0.0, "t_11": 1.0, "t_12": 0.0, "t_13": 2.0,
        "t_20": 0.0, "t_21": 0.0, "t_22": 1.0, "t_23": 3.0,
    });
    if let Some(score) = blur_score {
        camera["blur_score"] = serde_json::json!(score);
    }
    camera
}

fn write_polycam(
    data: &Path,
    image_dir: &str,
    cameras_dir: &str,
    blur_scores: &[Option<f64>],
) -> Result<(), Box<dyn std::error::Error>> {
    let image_dir = data.join("keyframes").join(image_dir);
    let cameras_dir = data.join("keyframes").join(cameras_dir);
    std::fs::create_dir_all(&image_dir)?;
    std::fs::create_dir_all(&cameras_dir)?;

    for (i, score) in blur_scores.iter().enumerate() {
        write_test_image(&image_dir.join(format!("{i}.jpg")), 64, 48)?;
        let camera = polycam_camera(*score, i as f64);
        std::fs::write(
            cameras_dir.join(format!("{i}.json")),
            serde_json::to_vec(&camera)?,
        )?;
    }
    Ok(())
}

#[test]
fn record3d_capture_to_dataset() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_record3d(data.path(), 5)?;

    let params = Record3dParams {
        num_downscales: 1,
        max_dataset_size: 3,
    };
    let reporter = MemoryReporter::new();
    let outcome = process_record3d(data.path(), output.path(), &params, &reporter)?;

    assert_eq!(outcome.num_frames, 3);
    let descriptor = outcome.descriptor.ok_or("no descriptor")?;
    let transforms = read_transforms(&descriptor)?;

    assert_eq!((transforms.w, transforms.h), (32, 24));
    assert_relative_eq!(transforms.fl_x, 100.0);
    assert_relative_eq!(transforms.cx, 16.0);
    assert_relative_eq!(transforms.cy, 12.0);
    assert!(transforms.k1.is_none());
    assert!(transforms.orientation_override.is_none());

    // linspace(0, 4, 3) selects frames 0, 2 and 4
    let paths = transforms
        .frames
        .iter()
        .map(|f| f.file_path.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        paths,
        [
            "./images/frame_00001.jpg",
            "./images/frame_00002.jpg",
            "./images/frame_00003.jpg"
        ]
    );
    assert_relative_eq!(transforms.frames[1].transform_matrix[0][3], 2.0);
    assert_relative_eq!(transforms.frames[2].transform_matrix[0][3], 4.0);

    let tier = image::open(output.path().join("images_2").join("frame_00001.jpg"))?;
    assert_eq!(tier.dimensions(), (16, 12));

    assert!(outcome.summary.lines().contains(&"Used 3 images out of 5 total"));
    assert!(reporter.contains(Level::Info, "We downsampled the images by 2x"));
    Ok(())
}

#[test]
fn record3d_missing_rgb_folder() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;

    let reporter = MemoryReporter::new();
    let res = process_record3d(data.path(), output.path(), &Record3dParams::default(), &reporter);
    assert!(matches!(res, Err(DatasetError::MissingInput(_))));
    assert!(!output.path().join("transforms.json").exists());
    Ok(())
}

#[test]
fn polycam_blur_filter_and_crop() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_polycam(
        data.path(),
        "corrected_images",
        "corrected_cameras",
        &[Some(30.0), Some(10.0), None, Some(50.0)],
    )?;

    let params = PolycamParams {
        num_downscales: 0,
        max_dataset_size: -1,
        crop_border_pixels: 4,
        ..Default::default()
    };
    let reporter = MemoryReporter::new();
    let outcome = process_polycam(data.path(), output.path(), &params, &reporter)?;
    assert_eq!(outcome.num_frames, 3);

    let transforms = read_transforms(outcome.descriptor.ok_or("no descriptor")?)?;
    assert_eq!((transforms.w, transforms.h), (56, 40));
    assert_relative_eq!(transforms.cx, 28.0);
    assert_relative_eq!(transforms.cy, 20.0);
    assert_relative_eq!(transforms.fl_y, 51.0);

    let value = serde_json::to_value(&transforms)?;
    assert_eq!(value["orientation_override"], "none");
    assert_eq!(value["camera_model"], "OPENCV");

    // the third kept frame is the fourth capture frame, rows reordered as [r2, r0, r1]
    let last = &transforms.frames[2];
    assert_eq!(last.file_path, "./images/frame_00003.jpg");
    assert_eq!(last.transform_matrix[0], [0.0, 0.0, 1.0, 3.0]);
    assert_eq!(last.transform_matrix[1], [1.0, 0.0, 0.0, 3.0]);
    assert_eq!(last.transform_matrix[2], [0.0, 1.0, 0.0, 2.0]);

    let cropped = image::open(output.path().join("images").join("frame_00001.jpg"))?;
    assert_eq!(cropped.dimensions(), (56, 40));

    assert!(reporter.contains(Level::Warn, "Skipped 1 frames due to low blur score."));
    assert!(outcome.summary.lines().contains(&"Final dataset is 3 frames."));
    Ok(())
}

#[test]
fn polycam_intrinsics_from_first_sampled_frame() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_polycam(
        data.path(),
        "corrected_images",
        "corrected_cameras",
        &[Some(1.0), Some(30.0)],
    )?;

    // the blurry first frame carries different intrinsics
    let mut first = polycam_camera(Some(1.0), 0.0);
    first["fx"] = serde_json::json!(77.0);
    std::fs::write(
        data.path().join("keyframes/corrected_cameras/0.json"),
        serde_json::to_vec(&first)?,
    )?;

    let params = PolycamParams {
        num_downscales: 0,
        crop_border_pixels: 0,
        ..Default::default()
    };
    let reporter = MemoryReporter::new();
    let outcome = process_polycam(data.path(), output.path(), &params, &reporter)?;
    assert_eq!(outcome.num_frames, 1);

    let transforms = read_transforms(outcome.descriptor.ok_or("no descriptor")?)?;
    assert_relative_eq!(transforms.fl_x, 77.0);
    assert_relative_eq!(transforms.fl_y, 51.0);
    assert_eq!(transforms.frames[0].transform_matrix[0], [0.0, 0.0, 1.0, 3.0]);
    assert_eq!(transforms.frames[0].transform_matrix[1], [1.0, 0.0, 0.0, 1.0]);
    Ok(())
}

#[test]
fn polycam_falls_back_to_raw_images() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_polycam(data.path(), "images", "cameras", &[None, None])?;

    let reporter = MemoryReporter::new();
    let params = PolycamParams {
        num_downscales: 0,
        ..Default::default()
    };
    let outcome = process_polycam(data.path(), output.path(), &params, &reporter)?;

    // no crop on raw keyframes
    let transforms = read_transforms(outcome.descriptor.ok_or("no descriptor")?)?;
    assert_eq!((transforms.w, transforms.h), (64, 48));
    assert!(reporter.contains(Level::Warn, "Corrected images not found"));
    Ok(())
}

#[test]
fn polycam_everything_blurry() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_polycam(
        data.path(),
        "corrected_images",
        "corrected_cameras",
        &[Some(1.0), Some(2.0)],
    )?;

    let reporter = MemoryReporter::new();
    let res = process_polycam(data.path(), output.path(), &PolycamParams::default(), &reporter);
    assert!(matches!(res, Err(DatasetError::EmptyDataset)));
    assert!(!output.path().join("transforms.json").exists());
    Ok(())
}

fn write_colmap_model(output: &Path, registered: &[&str]) -> Result<(), Box<dyn std::error::Error>> {
    let model_dir = output.join("colmap").join("sparse").join("0");
    std::fs::create_dir_all(&model_dir)?;
    std::fs::write(
        model_dir.join("cameras.txt"),
        "# Camera list with one line of data per camera:\n1 PINHOLE 32 24 30 31 16 12\n",
    )?;

    let mut images = String::from("# Image list with two lines of data per image:\n");
    for (i, name) in registered.iter().enumerate() {
        images.push_str(&format!("{} 1 0 0 0 0 0 {} 1 {name}\n\n", i + 1, i as f64));
    }
    std::fs::write(model_dir.join("images.txt"), images)?;
    Ok(())
}

#[test]
fn images_reuse_existing_reconstruction() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    for name in ["d.png", "a.png", "c.png", "b.png", ".hidden.png", "notes.txt"] {
        if name.ends_with(".png") {
            write_test_image(&data.path().join(name), 32, 24)?;
        } else {
            std::fs::write(data.path().join(name), "not an image")?;
        }
    }
    write_colmap_model(
        output.path(),
        &["frame_00003.png", "frame_00001.png", "frame_00004.png"],
    )?;

    let mut params = ImagesParams {
        num_downscales: 2,
        ..Default::default()
    };
    params.sfm.skip_colmap = true;

    let reporter = MemoryReporter::new();
    let outcome = process_images(data.path(), output.path(), &params, &reporter)?;
    assert_eq!(outcome.num_frames, 3);

    let transforms = read_transforms(outcome.descriptor.ok_or("no descriptor")?)?;
    assert_relative_eq!(transforms.fl_x, 30.0);
    assert_relative_eq!(transforms.fl_y, 31.0);
    assert_eq!(transforms.frames[0].file_path, "./images/frame_00001.png");
    assert_eq!(transforms.frames[2].file_path, "./images/frame_00004.png");
    for frame in transforms.frames.iter() {
        assert_eq!(frame.transform_matrix[3], [0.0, 0.0, 0.0, 1.0]);
    }

    for tier in ["images_2", "images_4"] {
        let mut names = std::fs::read_dir(output.path().join(tier))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        assert_eq!(
            names,
            ["frame_00001.png", "frame_00002.png", "frame_00003.png", "frame_00004.png"]
        );
    }

    let lines = outcome.summary.lines();
    assert!(lines.contains(&"Starting with 4 images"));
    assert!(lines.contains(&"COLMAP matched 3 images"));
    assert!(reporter.contains(Level::Warn, "COLMAP only found poses for 75.00% of the images."));
    Ok(())
}

#[test]
fn images_without_reconstruction() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_test_image(&data.path().join("a.png"), 16, 16)?;

    let mut params = ImagesParams {
        num_downscales: 0,
        ..Default::default()
    };
    params.sfm.skip_colmap = true;

    let reporter = MemoryReporter::new();
    let outcome = process_images(data.path(), output.path(), &params, &reporter)?;

    assert!(outcome.descriptor.is_none());
    assert!(!output.path().join("transforms.json").exists());
    assert!(reporter.contains(Level::Warn, "Could not find existing COLMAP results"));
    Ok(())
}

#[test]
fn images_missing_folder() -> Result<(), Box<dyn std::error::Error>> {
    let output = tempfile::tempdir()?;
    let reporter = MemoryReporter::new();
    let res = process_images(
        output.path().join("missing"),
        output.path(),
        &ImagesParams::default(),
        &reporter,
    );
    assert!(matches!(res, Err(DatasetError::MissingInput(_))));
    Ok(())
}

#[test]
fn images_default_matching_calls_colmap() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    write_test_image(&data.path().join("a.png"), 16, 16)?;

    let mut params = ImagesParams {
        num_downscales: 0,
        ..Default::default()
    };
    params.sfm.colmap_cmd = "nerfprep-missing-colmap".to_string();

    // no vocabulary tree is needed, the run fails on the COLMAP call itself
    let reporter = MemoryReporter::new();
    let res = process_images(data.path(), output.path(), &params, &reporter);
    assert!(matches!(
        res,
        Err(DatasetError::Io(IoError::CommandNotFound(cmd))) if cmd.contains("nerfprep-missing-colmap")
    ));
    Ok(())
}

#[test]
fn video_scenario_match_quality() -> Result<(), Box<dyn std::error::Error>> {
    let indices = sample_indices(240, 150)?;
    assert_eq!(indices.len(), 150);
    assert_eq!((indices[0], indices[149]), (0, 239));

    let (quality, message) = matching_summary(150, 130, "COLMAP");
    assert_eq!(quality, MatchQuality::Success);
    assert!(message.contains("86.67%"));
    Ok(())
}
