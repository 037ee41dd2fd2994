/// Media type constants for image blobs and manifests
pub mod media_type {
    /// OCI image manifest
    pub const OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";

    /// Image runtime configuration blob
    pub const IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";

    /// Gzip-compressed tar layer
    pub const LAYER_TAR_GZIP: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
}

/// Container image tag constants
pub mod tag {
    /// Default container image tag
    pub const DEFAULT: &str = "latest";
}

/// Root filesystem constants
pub mod rootfs {
    /// The only rootfs type defined by the image spec
    pub const FS_TYPE: &str = "layers";
}
