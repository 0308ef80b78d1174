use serde::{Deserialize, Serialize};

/// Closed set of resource types the loading pipeline knows how to dispatch.
///
/// Dispatch by file extension is a lookup into this enumeration; anything
/// outside it is not loadable and fails before any async work starts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Jpeg,
    Png,
    Mp3,
    Wav,
    Ogg,
    Json,
    Script,
}

impl ResourceType {
    pub const ALL: [ResourceType; 7] = [
        ResourceType::Jpeg,
        ResourceType::Png,
        ResourceType::Mp3,
        ResourceType::Wav,
        ResourceType::Ogg,
        ResourceType::Json,
        ResourceType::Script,
    ];

    /// Maps a file extension to its resource type. Pure; unknown extensions
    /// are not loadable.
    pub fn from_extension(extension: &str) -> Option<ResourceType> {
        match extension {
            "jpeg" => Some(ResourceType::Jpeg),
            "png" => Some(ResourceType::Png),
            "mp3" => Some(ResourceType::Mp3),
            "wav" => Some(ResourceType::Wav),
            "ogg" => Some(ResourceType::Ogg),
            "json" => Some(ResourceType::Json),
            "js" => Some(ResourceType::Script),
            _ => None,
        }
    }

    /// Infers the type from a library file path's extension.
    pub fn from_library_file_path(library_file_path: &str) -> Option<ResourceType> {
        library_file_path
            .rsplit_once('.')
            .and_then(|(_, extension)| ResourceType::from_extension(extension))
    }

    pub fn extension(self) -> &'static str {
        match self {
            ResourceType::Jpeg => "jpeg",
            ResourceType::Png => "png",
            ResourceType::Mp3 => "mp3",
            ResourceType::Wav => "wav",
            ResourceType::Ogg => "ogg",
            ResourceType::Json => "json",
            ResourceType::Script => "js",
        }
    }
}

/// Explicit type tag for a loading process, or inference from each file
/// path's extension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ResourceTypeSelection {
    #[default]
    Auto,
    Explicit(ResourceType),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_extension_inference() {
        assert_eq!(
            ResourceType::from_library_file_path("demo/assets/logo.png"),
            Some(ResourceType::Png)
        );
        assert_eq!(
            ResourceType::from_library_file_path("demo/sounds/theme.ogg"),
            Some(ResourceType::Ogg)
        );
        assert_eq!(ResourceType::from_library_file_path("demo/data.xyz"), None);
        assert_eq!(ResourceType::from_library_file_path("no_extension"), None);
    }

    #[test]
    fn check_extension_round_trip() {
        for resource_type in ResourceType::ALL {
            assert_eq!(
                ResourceType::from_extension(resource_type.extension()),
                Some(resource_type)
            );
        }
    }
}
