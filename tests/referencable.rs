use pretty_assertions::assert_eq;
use rain::emit::{CodeAddress, Generator, Referencable, ReferencableError, VariableAllocator};
use rain::types::CompilingType;

#[test]
fn test_forward_references_are_patched_once_known() {
    let mut buffer = vec![0xAA; 12];
    let mut target: Referencable<CodeAddress> = Referencable::new();
    target.write_at(&mut buffer, 0);
    target.write_at(&mut buffer, 4);
    assert_eq!(buffer[..8], [0; 8]);
    assert!(target.has_references());

    target.set_value(CodeAddress(0x0102_0304), &mut buffer).unwrap();
    assert_eq!(buffer[..8], [4, 3, 2, 1, 4, 3, 2, 1]);
    assert!(!target.has_references());

    // Known values are written directly.
    target.write_at(&mut buffer, 8);
    assert_eq!(buffer[8..], [4, 3, 2, 1]);
    target.dispose().unwrap();
}

#[test]
fn test_assigning_twice_fails() {
    let mut buffer = vec![0; 4];
    let mut target: Referencable<CodeAddress> = Referencable::new();
    target.set_value(CodeAddress(1), &mut buffer).unwrap();
    let error = target.set_value(CodeAddress(2), &mut buffer).unwrap_err();
    assert!(matches!(error, ReferencableError::AlreadyAssigned { .. }));
    assert_eq!(target.value(), Some(CodeAddress(1)));
    target.dispose().unwrap();
}

#[test]
fn test_dispose_reports_unresolved_references() {
    let mut buffer = vec![0; 8];
    let mut pending: Referencable<CodeAddress> = Referencable::new();
    pending.write_at(&mut buffer, 0);
    pending.write_at(&mut buffer, 4);
    assert_eq!(
        pending.dispose(),
        Err(ReferencableError::Unresolved { references: 2 })
    );

    // Never referenced and never assigned is fine.
    Referencable::<CodeAddress>::new().dispose().unwrap();
}

#[test]
fn test_forwarding_moves_pending_sites() {
    let mut buffer = vec![0; 8];
    let mut pad: Referencable<CodeAddress> = Referencable::new();
    let mut handler: Referencable<CodeAddress> = Referencable::new();
    pad.write_at(&mut buffer, 0);
    handler.write_at(&mut buffer, 4);

    pad.forward_to(&mut handler, &mut buffer);
    pad.dispose().unwrap();
    handler.set_value(CodeAddress(7), &mut buffer).unwrap();
    assert_eq!(buffer, vec![7, 0, 0, 0, 7, 0, 0, 0]);
    handler.dispose().unwrap();
}

#[test]
fn test_temporary_regions_are_laid_out_after_locals() {
    let mut variables = VariableAllocator::new(0, false);
    let number = variables.temporary(CompilingType::INTEGER);
    let mark = variables.mark();
    let text = variables.temporary(CompilingType::STRING);
    variables.temporary(CompilingType::BOOL);

    // Only managed temporaries need releasing when the block closes.
    let released = variables.clear_to(mark);
    assert_eq!(released.as_slice(), &[text]);
    assert!(!number.is_managed());

    // Managed region 16..20, value region 24..33.
    let mut generator = Generator::new(0);
    assert_eq!(variables.finish(&mut generator).unwrap(), 40);
}
