//! Background model built from synthetic recordings


use free_swimming_tracker::{
    background::{background_path, compute_brightest_backgrounds, load_background, save_background},
    pose::FrameStatus,
    preprocess::preprocess_frame,
    session::TrackingSession,
    video::FrameSequence,
    Result,
};
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    prelude::*,
};
use std::path::Path;
use test_helpers::{fish_frame, test_params, FRAME_SIZE};

fn bgr(value: f64) -> Result<Mat> {
    Ok(Mat::new_rows_cols_with_default(4, 4, CV_8UC3, Scalar::all(value))?)
}

#[test]
fn test_brightest_value_per_pixel() -> Result<()> {
    let mut source = FrameSequence::new(vec![bgr(10.0)?, bgr(200.0)?, bgr(30.0)?], 30.0);
    let backgrounds = compute_brightest_backgrounds(&mut source, 1)?;
    assert_eq!(*backgrounds[0].at_2d::<u8>(0, 0)?, 200);
    Ok(())
}

#[test]
fn test_moving_fish_leaves_a_clean_background() -> Result<()> {
    // Three positions far enough apart that no fish pixel overlaps
    let frames = vec![fish_frame(-30, false)?, fish_frame(0, false)?, fish_frame(30, false)?];
    let mut source = FrameSequence::new(frames, 30.0);
    let background = compute_brightest_backgrounds(&mut source, 1)?.remove(0);
    assert_eq!(background.rows(), FRAME_SIZE);
    assert_eq!(*background.at_2d::<u8>(40, 46)?, 255);
    assert_eq!(*background.at_2d::<u8>(60, 50)?, 255);

    let mut session = TrackingSession::new(test_params());
    let outcome = session.process(&preprocess_frame(&fish_frame(0, false)?, &background)?);
    assert_eq!(outcome.status, FrameStatus::Normal);
    assert_eq!((outcome.record.body.row, outcome.record.body.col), (44.0, 50.0));
    Ok(())
}

#[test]
fn test_saved_backgrounds_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let video = dir.path().join("larva.avi");
    let mut source = FrameSequence::new(vec![bgr(10.0)?, bgr(20.0)?, bgr(90.0)?, bgr(40.0)?], 30.0);
    let backgrounds = compute_brightest_backgrounds(&mut source, 2)?;

    for (index, background) in backgrounds.iter().enumerate() {
        save_background(&background_path(&video, index, 2), background)?;
    }
    let second = load_background(&dir.path().join("larva_brightest_background2.tif"))?;
    assert_eq!(*second.at_2d::<u8>(3, 3)?, 90);
    let first = load_background(&background_path(&video, 0, 2))?;
    assert_eq!(*first.at_2d::<u8>(3, 3)?, 20);
    assert!(!Path::new(&background_path(&video, 0, 1)).exists());
    Ok(())
}
