// Unit tests for domain models

use std::path::{Path, PathBuf};

use super::*;
use crate::domain::errors::JobFailure;

fn succeeded(index: usize) -> JobOutcome {
    JobOutcome::Succeeded {
        output_path: PathBuf::from(format!("/out/subclip_{}.mp4", index + 1)),
    }
}

#[test]
fn test_output_file_name_is_one_based() {
    let segment = SegmentDescriptor {
        index: 0,
        start_seconds: 0.0,
        length_seconds: 50.0,
    };
    assert_eq!(segment.output_file_name(), "subclip_1.mp4");
    assert_eq!(
        segment.output_path(Path::new("/tmp/ytstudio")),
        PathBuf::from("/tmp/ytstudio/subclip_1.mp4")
    );
    assert_eq!(segment.end_seconds(), 50.0);
}

#[test]
fn test_job_state_forward_transitions() {
    assert_eq!(JobState::Pending.advance(JobState::Running), Ok(JobState::Running));
    assert_eq!(
        JobState::Running.advance(JobState::Succeeded),
        Ok(JobState::Succeeded)
    );
    assert_eq!(JobState::Running.advance(JobState::Failed), Ok(JobState::Failed));
    assert_eq!(JobState::Pending.advance(JobState::Failed), Ok(JobState::Failed));
}

#[test]
fn test_job_state_rejects_backward_transitions() {
    assert!(JobState::Succeeded.advance(JobState::Running).is_err());
    assert!(JobState::Failed.advance(JobState::Pending).is_err());
    assert!(JobState::Pending.advance(JobState::Succeeded).is_err());
    assert!(JobState::Succeeded.advance(JobState::Failed).is_err());
}

#[test]
fn test_builder_rejects_second_outcome() {
    let mut builder = BatchResultBuilder::new(2);
    builder.record(0, succeeded(0)).unwrap();
    let err = builder
        .record(0, JobOutcome::Failed {
            reason: JobFailure::Cancelled,
        })
        .unwrap_err();
    assert_eq!(err.index, 0);
    assert_eq!(builder.recorded(), 1);
    assert!(!builder.is_complete());
}

#[test]
fn test_mixed_batch_counts_and_status() {
    let mut builder = BatchResultBuilder::new(3);
    builder.record(2, succeeded(2)).unwrap();
    builder
        .record(1, JobOutcome::Failed {
            reason: JobFailure::engine("conversion failed"),
        })
        .unwrap();
    builder.record(0, succeeded(0)).unwrap();
    assert!(builder.is_complete());

    let result = builder.finish();
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.succeeded_count() + result.failed_count(), result.planned());
    assert_eq!(result.status(), BatchStatus::PartiallySucceeded);

    let failures: Vec<_> = result.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 1);

    let outputs: Vec<_> = result.output_paths().collect();
    assert_eq!(
        outputs,
        vec![
            Path::new("/out/subclip_1.mp4"),
            Path::new("/out/subclip_3.mp4")
        ]
    );
}

#[test]
fn test_empty_batch_is_vacuous_success() {
    let result = BatchResult::empty();
    assert_eq!(result.planned(), 0);
    assert_eq!(result.succeeded_count(), 0);
    assert_eq!(result.failed_count(), 0);
    assert_eq!(result.status(), BatchStatus::Succeeded);
}

#[test]
fn test_all_failed_batch() {
    let mut builder = BatchResultBuilder::new(1);
    builder
        .record(0, JobOutcome::Failed {
            reason: JobFailure::Cancelled,
        })
        .unwrap();
    assert_eq!(builder.finish().status(), BatchStatus::Failed);
}

#[test]
fn test_crop_aspect_parse() {
    assert_eq!("9:16".parse::<CropAspect>().unwrap(), CropAspect::PORTRAIT_9_16);
    assert_eq!(" 4 : 5 ".parse::<CropAspect>().unwrap(), CropAspect::new(4, 5).unwrap());
    assert!("916".parse::<CropAspect>().is_err());
    assert!("0:16".parse::<CropAspect>().is_err());
    assert!("a:b".parse::<CropAspect>().is_err());
    assert_eq!(CropAspect::default().to_string(), "9:16");
}

#[test]
fn test_outcome_serializes_with_status_tag() {
    let json = serde_json::to_value(succeeded(0)).unwrap();
    assert_eq!(json["status"], "succeeded");
    assert_eq!(json["output_path"], "/out/subclip_1.mp4");
}
