use crate::{
    database::{video_store::VideoStore, RouteStore},
    error::{GatewayError, Result},
    inference::InferenceService,
};

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Required {
    Inference,
    RouteStore,
    VideoStore,
}

/// Borrowed handles to the collaborators a processor runs against.
#[derive(Clone, Copy)]
pub struct Facilities<'a> {
    inference: Option<&'a dyn InferenceService>,
    route_store: Option<&'a dyn RouteStore>,
    video_store: Option<&'a VideoStore>,
}

impl<'a> Facilities<'a> {
    pub fn inference(&self) -> Result<&'a dyn InferenceService> {
        self.inference.ok_or_else(|| Facilities::missing(Required::Inference))
    }

    pub fn route_store(&self) -> Result<&'a dyn RouteStore> {
        self.route_store.ok_or_else(|| Facilities::missing(Required::RouteStore))
    }

    pub fn video_store(&self) -> Result<&'a VideoStore> {
        self.video_store.ok_or_else(|| Facilities::missing(Required::VideoStore))
    }

    pub fn check(&self, required: &[Required]) -> Result<()> {
        for depend in required {
            let present = match depend {
                Required::Inference => self.inference.is_some(),
                Required::RouteStore => self.route_store.is_some(),
                Required::VideoStore => self.video_store.is_some(),
            };

            if !present {
                return Err(Facilities::missing(*depend));
            }
        }

        Ok(())
    }

    fn missing(required: Required) -> GatewayError {
        GatewayError::Config(format!("expecting {:?} facility", required))
    }
}

pub struct DependenciesBuilder<'a> {
    dependencies: Facilities<'a>,
}

impl<'a> DependenciesBuilder<'a> {
    pub fn new() -> Self {
        Self {
            dependencies: Facilities {
                inference: None,
                route_store: None,
                video_store: None,
            },
        }
    }

    pub fn with_inference(mut self, inference: &'a dyn InferenceService) -> Self {
        self.dependencies.inference = Some(inference);
        self
    }

    pub fn with_route_store(mut self, route_store: &'a dyn RouteStore) -> Self {
        self.dependencies.route_store = Some(route_store);
        self
    }

    pub fn with_video_store(mut self, video_store: &'a VideoStore) -> Self {
        self.dependencies.video_store = Some(video_store);
        self
    }

    pub fn build(self) -> Facilities<'a> {
        self.dependencies
    }
}

impl Default for DependenciesBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
