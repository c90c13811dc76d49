use serde::Serialize;

/// Turns a storage key into an absolute URI a client can be redirected to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostTemplate {
    /// `{scheme}://{bucket}.{endpoint}.{region}.amazonaws.com/{key}`
    S3Website {
        scheme: String,
        bucket: String,
        /// Endpoint label, e.g. `s3-website`.
        endpoint: String,
        region: String,
    },
    /// `https://{host}/{key}`
    RedirectHost { host: String },
}

impl HostTemplate {
    /// Everything in front of the key, without a trailing `/`.
    pub fn origin(&self) -> String {
        match self {
            Self::S3Website {
                scheme,
                bucket,
                endpoint,
                region,
            } => format!("{scheme}://{bucket}.{endpoint}.{region}.amazonaws.com"),
            Self::RedirectHost { host } => format!("https://{host}"),
        }
    }

    /// Pure string composition; the key is neither checked nor escaped.
    pub fn build_uri(&self, key: &str) -> String {
        format!("{}/{key}", self.origin())
    }

    /// Inverse of [`HostTemplate::build_uri`].
    pub fn key_from_uri<'a>(&self, uri: &'a str) -> Option<&'a str> {
        uri.strip_prefix(self.origin().as_str())?.strip_prefix('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn website() -> HostTemplate {
        HostTemplate::S3Website {
            scheme: "http".to_owned(),
            bucket: "simplytest".to_owned(),
            endpoint: "s3-website".to_owned(),
            region: "eu-central-1".to_owned(),
        }
    }

    #[test]
    fn builds_website_uri() {
        assert_eq!(
            website().build_uri("images/gopher.png"),
            "http://simplytest.s3-website.eu-central-1.amazonaws.com/images/gopher.png"
        );
    }

    #[test]
    fn builds_redirect_host_uri() {
        let hosts = HostTemplate::RedirectHost {
            host: "img.example.com".to_owned(),
        };
        assert_eq!(
            hosts.build_uri("client/w_1,h_1/a.jpg"),
            "https://img.example.com/client/w_1,h_1/a.jpg"
        );
    }

    #[test]
    fn key_round_trips() {
        let hosts = website();
        for key in ["gopher.png", "crazy/images/blue_marble.jpg", "/leading.jpg"] {
            assert_eq!(hosts.key_from_uri(&hosts.build_uri(key)), Some(key));
        }
        assert_eq!(hosts.key_from_uri("https://elsewhere/gopher.png"), None);
    }
}
