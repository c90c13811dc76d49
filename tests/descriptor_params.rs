use image_redirector::descriptor::{
    self, Conversion, DecodedDescriptor, DescriptorError, HostTemplate, ParamsDescriptor,
    RasterFormat, ResourceIdentity, TransformParams, Variant, validate,
};

const CLIENT: &str = "simplytest/c984c70e-a9f9-4cf8-b738-a5467b4dd462";

fn hosts() -> HostTemplate {
    HostTemplate::RedirectHost {
        host: "images.example.com".to_string(),
    }
}

#[test]
fn namespaced_request_decodes() {
    let descriptor = format!("{CLIENT}/w_500,h_500/blue_marble.jpg");
    let d = ParamsDescriptor::decode(&descriptor, &hosts()).unwrap();

    assert_eq!(d.namespace(), CLIENT);
    assert_eq!(d.params_token(), "w_500,h_500");
    assert_eq!(
        d.params(),
        &TransformParams {
            width: 500,
            height: 500,
            crop: false,
            grayscale: false,
            conversion: Conversion::JpegIfPng,
        }
    );
    assert_eq!(d.source_key(), format!("{CLIENT}/blue_marble.jpg"));
    assert_eq!(
        d.fallback_uri(),
        format!("https://images.example.com/{CLIENT}/blue_marble.jpg")
    );
}

#[test]
fn source_key_is_every_segment_but_the_parameters() {
    let d = ParamsDescriptor::decode(
        "client/e_grayscale,w_120,c_fit,h_80/2024/summer/beach.PNG",
        &hosts(),
    )
    .unwrap();
    assert_eq!(d.source_key(), "client/2024/summer/beach.PNG");
    assert_eq!(d.identity().prefix, vec!["2024", "summer"]);
    assert!(d.params().crop);
    assert!(d.params().grayscale);
}

#[test]
fn destination_extension_follows_reported_output() {
    use RasterFormat::{Jpeg, Png};

    let d = ParamsDescriptor::decode("client/w_64,h_64/logo.png", &hosts()).unwrap();
    assert_eq!(d.destination_key(Png, Jpeg), "client/w_64,h_64/logo.jpg");
    assert_eq!(d.destination_key(Png, Png), "client/w_64,h_64/logo.png");
    // JPEG bytes behind a `.png` key: nothing was converted, so the key stays.
    assert_eq!(d.destination_key(Jpeg, Png), "client/w_64,h_64/logo.png");
    assert_eq!(d.content_type(Jpeg), "image/jpeg");

    let d = ParamsDescriptor::decode("client/w_64,h_64/photo.jpeg", &hosts()).unwrap();
    assert_eq!(d.destination_key(Jpeg, Jpeg), "client/w_64,h_64/photo.jpeg");
}

#[test]
fn validate_agrees_with_decode() {
    for descriptor in [
        "ns/w_foo/w_5,h_5/x.jpg",
        "client/w_500,h_500/blue_marble.jpg",
        "a/b/w_1,h_1/c/d.png",
        "client/w_0,h_0/blue_marble.jpg",
        "client/h_500,c_fit/blue_marble.jpg",
        "client/w_500,h_500/blue_marble.gif",
        "client/blue_marble.jpg",
    ] {
        match (
            validate(descriptor, Variant::Params),
            ParamsDescriptor::decode(descriptor, &hosts()),
        ) {
            (true, Ok(_)) | (false, Err(_)) => {}
            // A list without a width scans but names no target size.
            (true, Err(DescriptorError::MissingParameterToken)) => {}
            (valid, decoded) => panic!("{descriptor}: validate={valid}, decode={decoded:?}"),
        }
    }
}

#[test]
fn first_parameter_list_with_a_width_splits_the_path() {
    let d = ParamsDescriptor::decode("ns/w_foo/w_5,h_5/x.jpg", &hosts()).unwrap();
    assert_eq!(d.namespace(), "ns/w_foo");
    assert_eq!(d.params_token(), "w_5,h_5");
    assert_eq!(d.source_key(), "ns/w_foo/x.jpg");
}

#[test]
fn height_only_list_passes_grammar_but_not_decoding() {
    let descriptor = "client/h_500,c_fit/blue_marble.jpg";
    assert!(validate(descriptor, Variant::Params));
    assert_eq!(
        ParamsDescriptor::decode(descriptor, &hosts()),
        Err(DescriptorError::MissingParameterToken)
    );
}

#[test]
fn grammar_edge_cases() {
    let cases = [
        ("client/w_500,h_500/blue_marble.jpg", true),
        ("client/w_9999,h_1/blue+marble.jpg", true),
        ("client/w_10000,h_1/blue_marble.jpg", false),
        ("client/w_500/blue_marble.jpg", false),
        ("client/w_1,h_1,c_fit,e_grayscale,c_fit/blue_marble.jpg", false),
        ("client/w_1,h_1,x_2/blue_marble.jpg", false),
        ("client/w_500,h_500/blue_marble.gif", false),
        ("client/w_500,h_500/", false),
        ("w_500,h_500/blue_marble.jpg", false),
        ("client/w_500,h_500/blue marble.jpg", false),
    ];
    for (descriptor, want) in cases {
        assert_eq!(validate(descriptor, Variant::Params), want, "{descriptor}");
    }
}

#[test]
fn too_few_segments_is_a_segment_count_error() {
    assert_eq!(
        ParamsDescriptor::decode("client/blue_marble.jpg", &hosts()),
        Err(DescriptorError::MalformedSegmentCount {
            expected: 3,
            found: 2,
        })
    );
}

#[test]
fn fallback_for_undecodable_descriptor_drops_parameter_lists() {
    let hosts = hosts();
    assert_eq!(
        descriptor::fallback_uri("client/w_0,h_0/blue_marble.jpg", Variant::Params, &hosts)
            .as_deref(),
        Some("https://images.example.com/client/blue_marble.jpg")
    );
    assert_eq!(
        descriptor::fallback_uri("blue_marble.gif", Variant::Params, &hosts),
        None
    );
}

#[test]
fn identity_round_trips_through_fallback_uri() {
    let hosts = hosts();
    let descriptor = format!("{CLIENT}/w_10,h_10,c_fit/a/b/c.jpg");
    let d = ParamsDescriptor::decode(&descriptor, &hosts).unwrap();
    let key = hosts.key_from_uri(d.fallback_uri()).unwrap();
    assert_eq!(
        &ResourceIdentity::from_source_key(key, d.namespace_depth()).unwrap(),
        d.identity()
    );
}
