//! Program builders shared by the synthesis tests.

use kiln_ir::{
    AccessFlags, Application, ClassKind, Code, DexClass, Instr, InvokeKind, ItemFactory, MethodDef,
    MethodRef, Origin, ProgramMethod, ProtoId, SharedFactory, TypeId,
};
use kiln_synthesis::{
    AppView, CommittedItems, MethodProcessingContext, ProcessorContext, SynthesisOptions, SyntheticKind,
};
use smallvec::smallvec;
use std::sync::Arc;

pub fn void_proto(factory: &ItemFactory) -> ProtoId {
    factory.intern_proto(factory.void_type(), &[])
}

pub fn int_to_int(factory: &ItemFactory) -> ProtoId {
    factory.intern_proto(factory.int_type(), &[factory.int_type()])
}

pub fn run_method(factory: &ItemFactory, ty: TypeId) -> MethodRef {
    factory.create_method(ty, "run", void_proto(factory))
}

/// Program class with a public `run()V` holding `instructions`.
pub fn class_with_run(factory: &ItemFactory, binary_name: &str, instructions: Vec<Instr>) -> Arc<DexClass> {
    let ty = factory.type_for_binary_name(binary_name);
    let mut class = DexClass::new(ty, ClassKind::Program, Origin::new("app.jar"));
    class.access = AccessFlags::PUBLIC;
    class.super_type = Some(factory.object_type());
    class.methods.push(MethodDef {
        reference: run_method(factory, ty),
        access: AccessFlags::PUBLIC,
        code: Some(Code::new(2, instructions)),
        annotations: Vec::new(),
    });
    Arc::new(class)
}

/// Program class whose `run()V` returns immediately.
pub fn input_class(factory: &ItemFactory, binary_name: &str) -> Arc<DexClass> {
    class_with_run(factory, binary_name, vec![Instr::Return { reg: None }])
}

/// Utility class with a static `op(I)I`.
pub fn util_class(factory: &ItemFactory, binary_name: &str) -> (Arc<DexClass>, MethodRef) {
    let ty = factory.type_for_binary_name(binary_name);
    let op = factory.create_method(ty, "op", int_to_int(factory));
    let mut class = DexClass::new(ty, ClassKind::Program, Origin::new("app.jar"));
    class.access = AccessFlags::PUBLIC;
    class.methods.push(MethodDef {
        reference: op,
        access: AccessFlags::PUBLIC | AccessFlags::STATIC,
        code: Some(Code::new(1, vec![Instr::Return { reg: Some(0) }])),
        annotations: Vec::new(),
    });
    (Arc::new(class), op)
}

pub fn view(
    factory: SharedFactory,
    classes: impl IntoIterator<Item = Arc<DexClass>>,
    options: SynthesisOptions,
) -> AppView {
    kiln_synthesis::init_tracing();
    let mut builder = Application::new().builder();
    for class in classes {
        builder.add_program_class(class);
    }
    let app = builder.build();
    AppView::new(factory, app, options)
}

/// Processing context for `run` of the program class `binary_name` in `wave`.
pub fn processing(view: &AppView, wave: ProcessorContext, binary_name: &str) -> MethodProcessingContext {
    let factory = view.factory();
    let ty = factory.type_for_binary_name(binary_name);
    let holder = Arc::clone(view.app().program_definition_for(ty).unwrap());
    wave.create_method_processing_context(ProgramMethod::new(holder, run_method(factory, ty)), factory)
}

/// Bridge `m(I)I` forwarding to `target`.
pub fn create_bridge(view: &AppView, processing: &mut MethodProcessingContext, target: MethodRef) -> ProgramMethod {
    let unique = processing.create_unique_context();
    let proto = int_to_int(view.factory());
    view.synthetics()
        .create_method(SyntheticKind::Bridge, &unique, view, |method| {
            method.set_proto(proto).set_code(Code::new(
                1,
                vec![
                    Instr::Invoke {
                        kind: InvokeKind::Static,
                        method: target,
                        args: smallvec![0],
                    },
                    Instr::MoveResult { dest: 0 },
                    Instr::Return { reg: Some(0) },
                ],
            ));
        })
        .unwrap()
}

/// Lambda class whose `get()I` returns `value`.
pub fn create_lambda(view: &AppView, processing: &mut MethodProcessingContext, value: i64) -> Arc<DexClass> {
    let unique = processing.create_unique_context();
    let factory = view.factory();
    let proto = factory.intern_proto(factory.int_type(), &[]);
    view.synthetics()
        .create_class(SyntheticKind::Lambda, &unique, view, |class| {
            class.add_method("get", |method| {
                method
                    .set_proto(proto)
                    .set_access(AccessFlags::PUBLIC | AccessFlags::FINAL)
                    .set_code(Code::new(
                        1,
                        vec![Instr::ConstInt { dest: 0, value }, Instr::Return { reg: Some(0) }],
                    ));
            });
        })
        .unwrap()
}

/// Body calling `method` with a constant argument.
pub fn call(method: MethodRef) -> Vec<Instr> {
    vec![
        Instr::ConstInt { dest: 0, value: 1 },
        Instr::Invoke {
            kind: InvokeKind::Static,
            method,
            args: smallvec![0],
        },
        Instr::MoveResult { dest: 0 },
        Instr::Return { reg: None },
    ]
}

/// Body instantiating `ty`.
pub fn instantiate(ty: TypeId) -> Vec<Instr> {
    vec![Instr::NewInstance { dest: 0, ty }, Instr::Return { reg: None }]
}

/// Replace the program classes of `view` with `classes` and commit.
pub fn commit_with(view: &mut AppView, classes: impl IntoIterator<Item = Arc<DexClass>>) -> CommittedItems {
    let mut builder = view.app().builder();
    for class in classes {
        builder.add_program_class(class);
    }
    let app = builder.build();
    view.commit_application(app)
}

pub fn class_named(view: &AppView, binary_name: &str) -> Arc<DexClass> {
    let ty = view.factory().type_for_binary_name(binary_name);
    Arc::clone(
        view.app()
            .program_definition_for(ty)
            .unwrap_or_else(|| panic!("no program class {binary_name}")),
    )
}

pub fn program_names(view: &AppView) -> Vec<&'static str> {
    let mut names: Vec<_> = view
        .app()
        .program_classes()
        .map(|class| view.factory().binary_name(class.ty))
        .collect();
    names.sort_unstable();
    names
}

/// Every method invoked by the code of `class`, in order.
pub fn invoked_methods(class: &DexClass) -> Vec<MethodRef> {
    class
        .methods
        .iter()
        .filter_map(|method| method.code.as_ref())
        .flat_map(|code| code.instructions.iter())
        .filter_map(|instr| match instr {
            Instr::Invoke { method, .. } => Some(*method),
            _ => None,
        })
        .collect()
}

/// Text rendering of the program that only depends on names.
pub fn render(view: &AppView) -> Vec<String> {
    let factory = view.factory();
    let mut classes: Vec<_> = view.app().program_classes().cloned().collect();
    classes.sort_by_key(|class| factory.binary_name(class.ty));
    let mut lines = Vec::new();
    for class in classes {
        lines.push(format!("class {}", factory.descriptor(class.ty)));
        for context in &class.synthesized_from {
            lines.push(format!("  from {}", factory.descriptor(*context)));
        }
        for method in &class.methods {
            lines.push(format!("  {}", factory.method_to_string(method.reference)));
            let instructions = method.code.iter().flat_map(|code| code.instructions.iter());
            for instr in instructions {
                lines.push(match instr {
                    Instr::Invoke { method, .. } => format!("    invoke {}", factory.method_to_string(*method)),
                    Instr::NewInstance { ty, .. } => format!("    new {}", factory.descriptor(*ty)),
                    Instr::ConstInt { value, .. } => format!("    const {value}"),
                    other => format!("    {}", opcode(other)),
                });
            }
        }
    }
    lines
}

fn opcode(instr: &Instr) -> &'static str {
    match instr {
        Instr::MoveResult { .. } => "move-result",
        Instr::Return { .. } => "return",
        _ => "other",
    }
}
