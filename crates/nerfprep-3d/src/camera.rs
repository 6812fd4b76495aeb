use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::io::colmap::{CameraModelId, ColmapCamera};
use crate::io::opensfm::OpenSfmCamera;

/// Error types for the camera module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CameraError {
    /// The number of parameters does not match the camera model.
    #[error("camera model {model:?} expects {expected} parameters, got {actual}")]
    InvalidNumCameraParams {
        /// The reconstruction camera model.
        model: CameraModelId,
        /// Number of parameters the model carries.
        expected: usize,
        /// Number of parameters found.
        actual: usize,
    },

    /// The reconstruction camera model has no canonical counterpart.
    #[error("unsupported camera model {0:?}")]
    UnsupportedCameraModel(CameraModelId),

    /// Unknown camera type name.
    #[error("unknown camera type `{0}`, expected perspective, fisheye or equirectangular")]
    UnknownCameraType(String),

    /// The distortion coefficients do not belong to the camera model.
    #[error("distortion {distortion} is not valid for camera model {model}")]
    DistortionMismatch {
        /// The camera model.
        model: CameraModel,
        /// Name of the distortion kind.
        distortion: &'static str,
    },

    /// The border crop removes the whole image.
    #[error("cannot crop {margin} pixels from each border of a {width}x{height} image")]
    CropTooLarge {
        /// Pixels cropped from each border.
        margin: u32,
        /// Image width before cropping.
        width: u32,
        /// Image height before cropping.
        height: u32,
    },
}

/// The canonical camera models of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraModel {
    /// Perspective camera with Brown-Conrady distortion.
    #[serde(rename = "OPENCV")]
    Perspective,
    /// Fisheye camera with the Kannala-Brandt distortion.
    #[serde(rename = "OPENCV_FISHEYE")]
    Fisheye,
    /// 360 degree equirectangular camera.
    #[serde(rename = "EQUIRECTANGULAR")]
    Equirectangular,
}

impl CameraModel {
    /// The name written to the dataset descriptor.
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraModel::Perspective => "OPENCV",
            CameraModel::Fisheye => "OPENCV_FISHEYE",
            CameraModel::Equirectangular => "EQUIRECTANGULAR",
        }
    }
}

impl std::fmt::Display for CameraModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CameraModel {
    type Err = CameraError;

    /// Parse the user facing camera type: `perspective`, `fisheye` or `equirectangular`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "perspective" => Ok(CameraModel::Perspective),
            "fisheye" => Ok(CameraModel::Fisheye),
            "equirectangular" => Ok(CameraModel::Equirectangular),
            _ => Err(CameraError::UnknownCameraType(s.to_string())),
        }
    }
}

/// Lens distortion coefficients.
///
/// The variant decides which keys the dataset descriptor carries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distortion {
    /// Radial and tangential coefficients of the perspective model.
    Brown {
        /// First radial coefficient.
        k1: f64,
        /// Second radial coefficient.
        k2: f64,
        /// First tangential coefficient.
        p1: f64,
        /// Second tangential coefficient.
        p2: f64,
    },
    /// Coefficients of the fisheye model.
    Fisheye {
        /// First coefficient.
        k1: f64,
        /// Second coefficient.
        k2: f64,
        /// Third coefficient.
        k3: f64,
        /// Fourth coefficient.
        k4: f64,
    },
    /// No coefficients, the images are undistorted or equirectangular.
    None,
}

impl Distortion {
    /// Pick the coefficients carried by `model` out of a full set.
    pub fn for_model(model: CameraModel, coeffs: &DistortionCoefficients) -> Self {
        match model {
            CameraModel::Perspective => Distortion::Brown {
                k1: coeffs.k1,
                k2: coeffs.k2,
                p1: coeffs.p1,
                p2: coeffs.p2,
            },
            CameraModel::Fisheye => Distortion::Fisheye {
                k1: coeffs.k1,
                k2: coeffs.k2,
                k3: coeffs.k3,
                k4: coeffs.k4,
            },
            CameraModel::Equirectangular => Distortion::None,
        }
    }

    /// The coefficients as `(name, value)` pairs in descriptor order.
    pub fn coefficients(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Distortion::Brown { k1, k2, p1, p2 } => vec![("k1", k1), ("k2", k2), ("p1", p1), ("p2", p2)],
            Distortion::Fisheye { k1, k2, k3, k4 } => {
                vec![("k1", k1), ("k2", k2), ("k3", k3), ("k4", k4)]
            }
            Distortion::None => Vec::new(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Distortion::Brown { .. } => "brown",
            Distortion::Fisheye { .. } => "fisheye",
            Distortion::None => "none",
        }
    }
}

/// Every distortion coefficient a backend may report, zero when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistortionCoefficients {
    /// First radial coefficient.
    pub k1: f64,
    /// Second radial coefficient.
    pub k2: f64,
    /// Third radial coefficient.
    pub k3: f64,
    /// Fourth radial coefficient.
    pub k4: f64,
    /// First tangential coefficient.
    pub p1: f64,
    /// Second tangential coefficient.
    pub p2: f64,
}

/// Camera intrinsics shared by every frame of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Intrinsics {
    /// Focal length along x in pixels.
    pub fl_x: f64,
    /// Focal length along y in pixels.
    pub fl_y: f64,
    /// Principal point x in pixels.
    pub cx: f64,
    /// Principal point y in pixels.
    pub cy: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// The camera model.
    pub camera_model: CameraModel,
    /// The distortion coefficients.
    pub distortion: Distortion,
}

impl Intrinsics {
    /// Create the intrinsics, checking that the distortion fits the camera model.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        fl_x: f64,
        fl_y: f64,
        cx: f64,
        cy: f64,
        width: u32,
        height: u32,
        camera_model: CameraModel,
        distortion: Distortion,
    ) -> Result<Self, CameraError> {
        let valid = matches!(
            (camera_model, &distortion),
            (_, Distortion::None)
                | (CameraModel::Perspective, Distortion::Brown { .. })
                | (CameraModel::Fisheye, Distortion::Fisheye { .. })
        );
        if !valid {
            return Err(CameraError::DistortionMismatch {
                model: camera_model,
                distortion: distortion.name(),
            });
        }

        Ok(Self {
            fl_x,
            fl_y,
            cx,
            cy,
            width,
            height,
            camera_model,
            distortion,
        })
    }

    /// Adjust the intrinsics for images cropped by `margin` pixels on every border.
    ///
    /// The principal point moves by `margin` and both dimensions shrink by
    /// `2 * margin`. Focal lengths are unchanged.
    ///
    /// Example:
    ///
    /// ```
    /// use nerfprep_3d::camera::{CameraModel, Distortion, Intrinsics};
    ///
    /// let intrinsics = Intrinsics::new(
    ///     1000.0, 1000.0, 960.0, 540.0, 1920, 1080,
    ///     CameraModel::Perspective, Distortion::None,
    /// ).unwrap();
    /// let cropped = intrinsics.crop_border(15).unwrap();
    /// assert_eq!((cropped.width, cropped.height), (1890, 1050));
    /// assert_eq!((cropped.cx, cropped.cy), (945.0, 525.0));
    /// ```
    pub fn crop_border(&self, margin: u32) -> Result<Self, CameraError> {
        let crop = 2 * u64::from(margin);
        if crop >= u64::from(self.width) || crop >= u64::from(self.height) {
            return Err(CameraError::CropTooLarge {
                margin,
                width: self.width,
                height: self.height,
            });
        }

        Ok(Self {
            cx: self.cx - f64::from(margin),
            cy: self.cy - f64::from(margin),
            width: self.width - 2 * margin,
            height: self.height - 2 * margin,
            ..self.clone()
        })
    }
}

/// Intrinsics as reported by one of the supported sources.
#[derive(Debug, Clone)]
pub enum RawIntrinsics {
    /// A COLMAP camera record.
    Colmap(ColmapCamera),

    /// An OpenSfM camera entry.
    OpenSfm(OpenSfmCamera),

    /// Record3D metadata: the 3x3 camera matrix as stored (column major) and the
    /// image size.
    Record3d {
        /// The flattened camera matrix.
        k: [f64; 9],
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Polycam per-frame camera fields.
    Polycam {
        /// Focal length along x.
        fx: f64,
        /// Focal length along y.
        fy: f64,
        /// Principal point x.
        cx: f64,
        /// Principal point y.
        cy: f64,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },
}

impl RawIntrinsics {
    /// Map the record to canonical intrinsics.
    ///
    /// Reconstruction records are expressed in `camera_model`. Record3D and
    /// Polycam images are already undistorted, so they always map to a
    /// perspective camera without distortion keys.
    pub fn to_intrinsics(&self, camera_model: CameraModel) -> Result<Intrinsics, CameraError> {
        match self {
            RawIntrinsics::Colmap(camera) => colmap_intrinsics(camera, camera_model),
            RawIntrinsics::OpenSfm(camera) => {
                let width = f64::from(camera.width);
                let height = f64::from(camera.height);
                let coeffs = DistortionCoefficients {
                    k1: camera.k1.unwrap_or_default(),
                    k2: camera.k2.unwrap_or_default(),
                    k3: camera.k3.unwrap_or_default(),
                    k4: camera.k4.unwrap_or_default(),
                    p1: camera.p1.unwrap_or_default(),
                    p2: camera.p2.unwrap_or_default(),
                };
                Intrinsics::new(
                    camera.focal_x.unwrap_or(height),
                    camera.focal_y.unwrap_or(height),
                    camera.c_x.unwrap_or(0.5 * width),
                    camera.c_y.unwrap_or(0.5 * height),
                    camera.width,
                    camera.height,
                    camera_model,
                    Distortion::for_model(camera_model, &coeffs),
                )
            }
            RawIntrinsics::Record3d { k, width, height } => {
                // the stored principal point is not reliable, use the image centre
                let focal_length = k[0];
                Intrinsics::new(
                    focal_length,
                    focal_length,
                    f64::from(*width) / 2.0,
                    f64::from(*height) / 2.0,
                    *width,
                    *height,
                    CameraModel::Perspective,
                    Distortion::None,
                )
            }
            RawIntrinsics::Polycam {
                fx,
                fy,
                cx,
                cy,
                width,
                height,
            } => Intrinsics::new(
                *fx,
                *fy,
                *cx,
                *cy,
                *width,
                *height,
                CameraModel::Perspective,
                Distortion::None,
            ),
        }
    }
}

fn colmap_intrinsics(
    camera: &ColmapCamera,
    camera_model: CameraModel,
) -> Result<Intrinsics, CameraError> {
    let model = camera.model_id;
    let expected = model.num_params();
    let p = &camera.params;
    if p.len() != expected {
        return Err(CameraError::InvalidNumCameraParams {
            model,
            expected,
            actual: p.len(),
        });
    }

    // (fx, fy, cx, cy) followed by the model specific coefficients
    let (fx, fy, cx, cy, coeffs) = match model {
        CameraModelId::SimplePinhole => (p[0], p[0], p[1], p[2], Default::default()),
        CameraModelId::Pinhole => (p[0], p[1], p[2], p[3], Default::default()),
        CameraModelId::SimpleRadial => (
            p[0],
            p[0],
            p[1],
            p[2],
            DistortionCoefficients {
                k1: p[3],
                ..Default::default()
            },
        ),
        CameraModelId::Radial => (
            p[0],
            p[0],
            p[1],
            p[2],
            DistortionCoefficients {
                k1: p[3],
                k2: p[4],
                ..Default::default()
            },
        ),
        CameraModelId::OpenCV | CameraModelId::FullOpenCV => (
            p[0],
            p[1],
            p[2],
            p[3],
            DistortionCoefficients {
                k1: p[4],
                k2: p[5],
                p1: p[6],
                p2: p[7],
                ..Default::default()
            },
        ),
        CameraModelId::OpenCVFisheye => (
            p[0],
            p[1],
            p[2],
            p[3],
            DistortionCoefficients {
                k1: p[4],
                k2: p[5],
                k3: p[6],
                k4: p[7],
                ..Default::default()
            },
        ),
        CameraModelId::Fov
        | CameraModelId::SimpleRadialFisheye
        | CameraModelId::RadialFisheye
        | CameraModelId::ThinPrismFisheye => {
            return Err(CameraError::UnsupportedCameraModel(model))
        }
    };

    Intrinsics::new(
        fx,
        fy,
        cx,
        cy,
        camera.width,
        camera.height,
        camera_model,
        Distortion::for_model(camera_model, &coeffs),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colmap_camera(model_id: CameraModelId, params: Vec<f64>) -> ColmapCamera {
        ColmapCamera {
            camera_id: 1,
            model_id,
            width: 640,
            height: 480,
            params,
        }
    }

    #[test]
    fn test_crop_border() -> Result<(), CameraError> {
        let intrinsics = Intrinsics::new(
            1200.0,
            1100.0,
            960.0,
            540.0,
            1920,
            1080,
            CameraModel::Perspective,
            Distortion::None,
        )?;
        let cropped = intrinsics.crop_border(15)?;
        assert_eq!(cropped.width, 1890);
        assert_eq!(cropped.height, 1050);
        assert_eq!(cropped.cx, 945.0);
        assert_eq!(cropped.cy, 525.0);
        assert_eq!(cropped.fl_x, 1200.0);
        assert_eq!(cropped.fl_y, 1100.0);

        assert_eq!(intrinsics.crop_border(0)?, intrinsics);
        assert!(matches!(
            intrinsics.crop_border(540),
            Err(CameraError::CropTooLarge { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_colmap_opencv() -> Result<(), CameraError> {
        let camera = colmap_camera(
            CameraModelId::OpenCV,
            vec![500.0, 510.0, 320.0, 240.0, 0.1, -0.05, 0.001, 0.002],
        );
        let intrinsics = RawIntrinsics::Colmap(camera).to_intrinsics(CameraModel::Perspective)?;
        assert_eq!(intrinsics.fl_x, 500.0);
        assert_eq!(intrinsics.fl_y, 510.0);
        assert_eq!(intrinsics.cx, 320.0);
        assert_eq!(intrinsics.cy, 240.0);
        assert_eq!(
            intrinsics.distortion.coefficients(),
            vec![("k1", 0.1), ("k2", -0.05), ("p1", 0.001), ("p2", 0.002)]
        );
        Ok(())
    }

    #[test]
    fn test_colmap_fisheye() -> Result<(), CameraError> {
        let camera = colmap_camera(
            CameraModelId::OpenCVFisheye,
            vec![300.0, 300.0, 320.0, 240.0, 0.1, 0.2, 0.3, 0.4],
        );
        let intrinsics = RawIntrinsics::Colmap(camera).to_intrinsics(CameraModel::Fisheye)?;
        assert_eq!(
            intrinsics.distortion,
            Distortion::Fisheye {
                k1: 0.1,
                k2: 0.2,
                k3: 0.3,
                k4: 0.4
            }
        );
        Ok(())
    }

    #[test]
    fn test_colmap_simple_radial() -> Result<(), CameraError> {
        let camera = colmap_camera(CameraModelId::SimpleRadial, vec![400.0, 320.0, 240.0, 0.01]);
        let intrinsics = RawIntrinsics::Colmap(camera).to_intrinsics(CameraModel::Perspective)?;
        assert_eq!((intrinsics.fl_x, intrinsics.fl_y), (400.0, 400.0));
        assert_eq!(
            intrinsics.distortion,
            Distortion::Brown {
                k1: 0.01,
                k2: 0.0,
                p1: 0.0,
                p2: 0.0
            }
        );
        Ok(())
    }

    #[test]
    fn test_colmap_wrong_param_count() {
        let camera = colmap_camera(CameraModelId::OpenCV, vec![500.0, 500.0, 320.0, 240.0]);
        let res = RawIntrinsics::Colmap(camera).to_intrinsics(CameraModel::Perspective);
        assert_eq!(
            res,
            Err(CameraError::InvalidNumCameraParams {
                model: CameraModelId::OpenCV,
                expected: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_opensfm_fallbacks() -> Result<(), CameraError> {
        let camera = OpenSfmCamera {
            projection_type: Some("equirectangular".to_string()),
            width: 2000,
            height: 1000,
            focal_x: None,
            focal_y: None,
            c_x: None,
            c_y: None,
            k1: None,
            k2: None,
            k3: None,
            k4: None,
            p1: None,
            p2: None,
        };
        let intrinsics =
            RawIntrinsics::OpenSfm(camera).to_intrinsics(CameraModel::Equirectangular)?;
        assert_eq!(intrinsics.fl_x, 1000.0);
        assert_eq!(intrinsics.fl_y, 1000.0);
        assert_eq!(intrinsics.cx, 1000.0);
        assert_eq!(intrinsics.cy, 500.0);
        assert!(intrinsics.distortion.coefficients().is_empty());
        Ok(())
    }

    #[test]
    fn test_record3d_uses_image_centre() -> Result<(), CameraError> {
        let raw = RawIntrinsics::Record3d {
            k: [700.0, 0.0, 0.0, 0.0, 700.0, 0.0, 350.0, 250.0, 1.0],
            width: 720,
            height: 960,
        };
        let intrinsics = raw.to_intrinsics(CameraModel::Fisheye)?;
        assert_eq!(intrinsics.camera_model, CameraModel::Perspective);
        assert_eq!((intrinsics.fl_x, intrinsics.fl_y), (700.0, 700.0));
        assert_eq!((intrinsics.cx, intrinsics.cy), (360.0, 480.0));
        assert_eq!(intrinsics.distortion, Distortion::None);
        Ok(())
    }

    #[test]
    fn test_distortion_mismatch() {
        let res = Intrinsics::new(
            1.0,
            1.0,
            0.0,
            0.0,
            2,
            2,
            CameraModel::Equirectangular,
            Distortion::Fisheye {
                k1: 0.0,
                k2: 0.0,
                k3: 0.0,
                k4: 0.0,
            },
        );
        assert!(matches!(res, Err(CameraError::DistortionMismatch { .. })));
    }

    #[test]
    fn test_camera_type_names() -> Result<(), CameraError> {
        assert_eq!("fisheye".parse::<CameraModel>()?, CameraModel::Fisheye);
        assert_eq!(CameraModel::Perspective.as_str(), "OPENCV");
        assert!("pinhole".parse::<CameraModel>().is_err());
        Ok(())
    }
}
