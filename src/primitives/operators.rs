use crate::{
  args::Args,
  block_utility::BlockUtility,
  deferred::Reported,
  runtime::Runtime,
  value::Value,
};
use std::f64::consts::PI;

pub fn register(runtime: &mut Runtime) {
  runtime.register_primitive("operator_add", add);
  runtime.register_primitive("operator_subtract", subtract);
  runtime.register_primitive("operator_multiply", multiply);
  runtime.register_primitive("operator_divide", divide);
  runtime.register_primitive("operator_lt", lt);
  runtime.register_primitive("operator_equals", equals);
  runtime.register_primitive("operator_gt", gt);
  runtime.register_primitive("operator_and", and);
  runtime.register_primitive("operator_or", or);
  runtime.register_primitive("operator_not", not);
  runtime.register_primitive("operator_random", random);
  runtime.register_primitive("operator_join", join);
  runtime.register_primitive("operator_letter_of", letter_of);
  runtime.register_primitive("operator_length", length);
  runtime.register_primitive("operator_contains", contains);
  runtime.register_primitive("operator_mod", modulo);
  runtime.register_primitive("operator_round", round);
  runtime.register_primitive("operator_mathop", mathop);
}

fn operand(args: &Args, name: &str) -> Value {
  args
    .value(name)
    .cloned()
    .unwrap_or_else(|| Value::String(String::new()))
}

fn add(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.number("NUM1") + args.number("NUM2")).into()
}

fn subtract(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.number("NUM1") - args.number("NUM2")).into()
}

fn multiply(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.number("NUM1") * args.number("NUM2")).into()
}

fn divide(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.number("NUM1") / args.number("NUM2")).into()
}

fn lt(args: &Args, _util: &mut BlockUtility) -> Reported {
  (operand(args, "OPERAND1").compare(&operand(args, "OPERAND2")) < 0.).into()
}

fn equals(args: &Args, _util: &mut BlockUtility) -> Reported {
  (operand(args, "OPERAND1").compare(&operand(args, "OPERAND2")) == 0.).into()
}

fn gt(args: &Args, _util: &mut BlockUtility) -> Reported {
  (operand(args, "OPERAND1").compare(&operand(args, "OPERAND2")) > 0.).into()
}

fn and(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.boolean("OPERAND1") && args.boolean("OPERAND2")).into()
}

fn or(args: &Args, _util: &mut BlockUtility) -> Reported {
  (args.boolean("OPERAND1") || args.boolean("OPERAND2")).into()
}

fn not(args: &Args, _util: &mut BlockUtility) -> Reported {
  (!args.boolean("OPERAND")).into()
}

fn random(args: &Args, _util: &mut BlockUtility) -> Reported {
  let from = operand(args, "FROM");
  let to = operand(args, "TO");
  let n_from = from.to_f64();
  let n_to = to.to_f64();
  let (low, high) = if n_from <= n_to {
    (n_from, n_to)
  } else {
    (n_to, n_from)
  };
  if low == high {
    return low.into();
  }
  // SAFETY: `rand` has no preconditions; the runtime is single threaded.
  let sample = unsafe { libc::rand() };
  if from.is_int() && to.is_int() {
    let span = (high - low).floor() + 1.;
    (low + (sample as f64 % span)).into()
  } else {
    (low + (sample as f64 / libc::RAND_MAX as f64) * (high - low)).into()
  }
}

fn join(args: &Args, _util: &mut BlockUtility) -> Reported {
  format!("{}{}", args.string("STRING1"), args.string("STRING2")).into()
}

fn letter_of(args: &Args, _util: &mut BlockUtility) -> Reported {
  let index = args.number("LETTER") as usize;
  operand(args, "STRING")
    .map_as_str(|s| {
      index
        .checked_sub(1)
        .and_then(|index| s.chars().nth(index))
        .map(|c| c.to_string())
        .unwrap_or_default()
    })
    .into()
}

fn length(args: &Args, _util: &mut BlockUtility) -> Reported {
  (operand(args, "STRING").map_as_str(|s| s.chars().count()) as f64).into()
}

fn contains(args: &Args, _util: &mut BlockUtility) -> Reported {
  let haystack = args.string("STRING1").to_lowercase();
  let needle = args.string("STRING2").to_lowercase();
  haystack.contains(needle.as_str()).into()
}

fn modulo(args: &Args, _util: &mut BlockUtility) -> Reported {
  let n = args.number("NUM1");
  let modulus = args.number("NUM2");
  let mut result = n % modulus;
  if result / modulus < 0. {
    result += modulus;
  }
  result.into()
}

fn round(args: &Args, _util: &mut BlockUtility) -> Reported {
  args.number("NUM").round().into()
}

fn mathop(args: &Args, _util: &mut BlockUtility) -> Reported {
  let value = args.number("NUM");
  let operator = args.string("OPERATOR").to_lowercase();
  let result = match operator.as_str() {
    "abs" => value.abs(),
    "floor" => value.floor(),
    "ceiling" => value.ceil(),
    "sqrt" => value.sqrt(),
    "sin" => truncate_float(degrees_to_radians(value).sin()),
    "cos" => truncate_float(degrees_to_radians(value).cos()),
    "tan" => {
      let angle = value % 360.;
      if angle == -270. || angle == 90. {
        f64::INFINITY
      } else if angle == -90. || angle == 270. {
        f64::NEG_INFINITY
      } else {
        truncate_float(degrees_to_radians(angle).tan())
      }
    }
    "asin" => radians_to_degrees(value.asin()),
    "acos" => radians_to_degrees(value.acos()),
    "atan" => radians_to_degrees(value.atan()),
    "ln" => value.ln(),
    "log" => value.log10(),
    "e ^" => value.exp(),
    "10 ^" => 10f64.powf(value),
    _ => 0.,
  };
  result.into()
}

fn degrees_to_radians(degrees: f64) -> f64 {
  (PI * degrees) / 180.
}

fn radians_to_degrees(radians: f64) -> f64 {
  (radians * 180.) / PI
}

fn truncate_float(value: f64) -> f64 {
  (value * 1e10).round() / 1e10
}
