pub mod inspect;
pub mod validate;

use tflite_check::TensorContract;

pub(crate) fn print_contract(role: &str, contract: &TensorContract) {
    println!("{role}:");
    println!("   shape: {:?}", contract.shape);
    println!("   type: {}", contract.element_type);
    if !contract.name.is_empty() {
        println!("   name: {}", contract.name);
    }
    if let Some(q) = contract.quantization {
        println!(
            "   quantization: scale {}, zero point {}",
            q.scale, q.zero_point
        );
    }
}
