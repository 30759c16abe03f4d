//! Face detection, alignment, recognition and identity tracking for frame
//! sequences.
//!
//! Each bounded context keeps its pure types and algorithms in `domain` and
//! its ONNX Runtime, filesystem and JSON adapters in `infrastructure`.

pub mod shared {
    pub mod bbox;
    pub mod config;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod onnx_session;
    pub mod preprocess;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod non_max_suppressor;
        pub mod proposal;
        pub mod proposal_aggregator;
        pub mod stride_decoder;
    }
    pub mod infrastructure;
}

pub mod alignment {
    pub mod domain {
        pub mod affine_transform;
        pub mod landmark_aligner;
        pub mod similarity_estimator;
    }
    pub mod infrastructure;
}

pub mod recognition {
    pub mod domain {
        pub mod embedding;
        pub mod face_embedder;
        pub mod gallery;
        pub mod gallery_matcher;
        pub mod gallery_store;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod identity_tracker;
        pub mod label_history;
    }
}

pub mod video {
    pub mod domain {
        pub mod frame_reader;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod enroll_identity_use_case;
    pub mod frame_analyzer;
    pub mod infrastructure;
    pub mod manage_identities_use_case;
    pub mod pipeline_logger;
    pub mod recognition_state;
    pub mod recognize_frame_use_case;
}
