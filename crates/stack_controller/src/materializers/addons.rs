use fleet_core::ChildStatus;

use crate::api::v1alpha1::gateway_bundle::GatewayBundleSpec;
use crate::materializers::common::child_name;
use cluster_pool::Edition;

/// GatewayBundle add-ons: stubs returning `not configured` on the community
/// path; only meaningful once an enterprise edition has been detected for
/// the target cluster (§4.3).
pub fn materialize(bundle_name: &str, spec: &GatewayBundleSpec, edition: Edition) -> Vec<ChildStatus> {
    let Some(enterprise) = spec.enterprise.as_ref() else {
        return vec![
            ChildStatus::not_configured("WafPolicy", child_name(bundle_name, "waf")),
            ChildStatus::not_configured("AdvancedMetrics", child_name(bundle_name, "metrics")),
        ];
    };

    if edition != Edition::Enterprise {
        return vec![
            ChildStatus::not_configured("WafPolicy", child_name(bundle_name, "waf")),
            ChildStatus::not_configured("AdvancedMetrics", child_name(bundle_name, "metrics")),
        ];
    }

    vec![
        addon_status(bundle_name, "waf", "WafPolicy", enterprise.waf_enabled),
        addon_status(bundle_name, "metrics", "AdvancedMetrics", enterprise.advanced_metrics_enabled),
    ]
}

fn addon_status(bundle_name: &str, suffix: &str, kind: &str, enabled: bool) -> ChildStatus {
    let name = child_name(bundle_name, suffix);
    if enabled {
        ChildStatus::new(kind, name, true, "in sync")
    } else {
        ChildStatus::not_configured(kind, name)
    }
}
