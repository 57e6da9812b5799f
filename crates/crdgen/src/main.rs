use fleet_core::ManagedCluster;
use kube::CustomResourceExt as _;
use stack_controller::api::v1alpha1::{GatewayBundle, InferenceStack};

fn main() {
    print!("{}", serde_yaml::to_string(&ManagedCluster::crd()).unwrap());
    println!("---");
    print!("{}", serde_yaml::to_string(&InferenceStack::crd()).unwrap());
    println!("---");
    print!("{}", serde_yaml::to_string(&GatewayBundle::crd()).unwrap());
}
