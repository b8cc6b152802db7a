//! Geometric core of a virtual try-on system: locate a face, solve its head
//! pose, project accessory anchors into the frame and match the overlay's
//! brightness to the scene.

pub mod shared {
    pub mod camera_intrinsics;
    pub mod config;
    pub mod constants;
    pub mod frame;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_locator;
        pub mod landmark_index_table;
        pub mod landmark_set;
        pub mod landmark_strategy;
    }
    pub mod infrastructure;
}

pub mod pose {
    pub mod domain {
        pub mod face_3d_model;
        pub mod head_pose_estimator;
        pub mod pose_error;
        pub mod pose_estimate;
        pub mod pose_solver;
    }
    pub mod infrastructure {
        pub mod levenberg_marquardt_solver;
    }
}

pub mod projection {
    pub mod domain {
        pub mod projector;
    }
}

pub mod lighting {
    pub mod domain {
        pub mod lighting_adapter;
    }
    pub mod infrastructure;
}

pub mod overlay {
    pub mod domain {
        pub mod overlay_asset;
        pub mod placement;
        pub mod rendered_overlay;
    }
    pub mod infrastructure;
}

pub mod image_io {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod try_on_image_use_case;
    pub mod try_on_pipeline;
}
