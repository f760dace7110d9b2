//! Real-time face detection and eye-contact inference.
//!
//! Frames flow one way: video source → tiered face detector → head pose
//! estimator → eye-contact classifier → rolling statistics → callbacks,
//! driven by the tick-based [`pipeline::frame_scheduler::FrameScheduler`].

pub mod detection {
    pub mod domain {
        pub mod detection_error;
        pub mod face_candidate;
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod multi_strategy_detector;
    }
    pub mod infrastructure;
}

pub mod eye_contact {
    pub mod domain {
        pub mod eye_contact_classifier;
        pub mod eye_contact_settings;
    }
}

pub mod overlay {
    pub mod domain {
        pub mod overlay_box;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod analyze_frame_use_case;
    pub mod detection_executor;
    pub mod frame_scheduler;
    pub mod infrastructure;
    pub mod pipeline_logger;
    pub mod ticker;
}

pub mod pose {
    pub mod domain {
        pub mod head_pose;
        pub mod head_pose_estimator;
    }
}

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod detected_face;
    pub mod frame;
    pub mod model_resolver;
    pub mod session_config;
}

pub mod statistics {
    pub mod domain {
        pub mod statistics_aggregator;
    }
}

pub mod video {
    pub mod domain {
        pub mod frame_pacer;
        pub mod snapshot_writer;
        pub mod video_source;
    }
    pub mod infrastructure;
}
