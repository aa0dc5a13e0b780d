use clap::Parser as ClapParser;
use std::process;

use heap::{HeapSettings, RootSet};
use object::Value;

use vm::{CallResult, CompareOp, RuntimeError, VM, VMCreateInfo, bootstrap};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Integers of the demo tuple
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_values_t = vec![1, 2, 3])]
    tuple: Vec<i64>,

    /// Decimal numerals multiplied together as longs
    #[arg(long = "long", allow_negative_numbers = true, default_values_t = vec!["12345".to_owned(), "2".to_owned()])]
    longs: Vec<String>,

    /// Bytes allocated before a safepoint collects
    #[arg(long, default_value_t = HeapSettings::default().bytes_before_gc)]
    gc_threshold: usize,

    /// Collect at every safepoint
    #[arg(long)]
    collect_every_safepoint: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let info = VMCreateInfo {
        heap: HeapSettings {
            bytes_before_gc: cli.gc_threshold,
            collect_on_every_safepoint: cli.collect_every_safepoint,
            ..Default::default()
        },
    };
    let mut vm = match bootstrap(info) {
        Ok(vm) => vm,
        Err(err) => {
            eprintln!("Error: invalid heap settings: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run(&mut vm, &cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(vm: &mut VM, cli: &Cli) -> Result<(), RuntimeError> {
    let mut roots = RootSet::new();

    // tuples
    let elements: Vec<Value> = cli.tuple.iter().map(|&n| Value::from_i64(n)).collect();
    let t = vm.create_tuple(&elements);
    roots.push(t);
    let tail = vm.create_tuple(&[Value::from_i64(elements.len() as i64 + 1)]);
    let joined = result_of(vm.call_attr(t, "__add__", &[tail])?)?;
    let reversed = vm.create_slice(None, None, Some(-1));
    let reversed = result_of(vm.call_attr(t, "__getitem__", &[reversed])?)?;
    roots.push(joined);

    println!("t            = {}", vm.repr(t)?);
    println!("t + {:<8} = {}", vm.repr(tail)?, vm.repr(joined)?);
    println!("t[::-1]      = {}", vm.repr(reversed)?);
    println!("hash(t)      = {}", vm.hash(t)?);
    println!("t < t[::-1]  = {}", vm.compare(t, reversed, CompareOp::Lt)?);

    let iter = result_of(vm.call_attr(t, "__iter__", &[])?)?;
    let mut items = Vec::new();
    loop {
        match vm.call_attr(iter, "next", &[]) {
            Ok(item) => items.push(vm.str(result_of(item)?)?),
            Err(RuntimeError::StopIteration) => break,
            Err(err) => return Err(err),
        }
    }
    println!("iter(t)      = {}", items.join(" "));

    // longs
    let long_class = vm.specials.long_class;
    let mut product: Option<Value> = None;
    for numeral in &cli.longs {
        let text = vm.create_str(numeral);
        let value = result_of(vm.call_class_attr(long_class, "__new__", &[long_class, text])?)?;
        product = Some(match product {
            None => value,
            Some(acc) => result_of(vm.call_attr(acc, "__mul__", &[value])?)?,
        });
    }
    if let Some(product) = product {
        roots.push(product);
        println!("product      = {} ({})", vm.str(product)?, vm.repr(product)?);
        println!("hash(product)= {}", vm.hash(product)?);
    }

    if let Some(collection) = vm.safepoint(&mut roots) {
        println!("safepoint gc : freed {}", collection.freed);
    }
    let collection = vm.collect(&mut roots);
    let stats = vm.heap.stats();
    println!(
        "gc           : {} collections, freed {} (last {}), finalized {}, live {} objects / {} bytes",
        stats.collections,
        stats.freed_objects,
        collection.freed,
        stats.finalized_objects,
        stats.live_objects,
        stats.live_bytes
    );
    Ok(())
}

fn result_of(result: CallResult) -> Result<Value, RuntimeError> {
    match result.value() {
        Some(value) => Ok(value),
        None => Err(RuntimeError::TypeError(
            "unsupported operand types".to_owned(),
        )),
    }
}
